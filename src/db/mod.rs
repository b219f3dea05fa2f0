pub mod models;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS songs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist TEXT,
                album TEXT,
                duration INTEGER NOT NULL DEFAULT 0,
                file_id TEXT NOT NULL,
                thumbnail_file_id TEXT,
                storage_message_id INTEGER,
                uploaded_by INTEGER NOT NULL,
                upload_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                play_count INTEGER NOT NULL DEFAULT 0,
                genre TEXT,
                year INTEGER
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS playlists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                created_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                is_public BOOLEAN NOT NULL DEFAULT 0
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS playlist_songs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                playlist_id INTEGER NOT NULL REFERENCES playlists(id),
                song_id INTEGER NOT NULL REFERENCES songs(id),
                position INTEGER,
                added_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS favorites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                song_id INTEGER NOT NULL REFERENCES songs(id),
                added_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, song_id)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS play_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                song_id INTEGER NOT NULL REFERENCES songs(id),
                played_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS user_preferences (
                user_id INTEGER PRIMARY KEY,
                shuffle BOOLEAN NOT NULL DEFAULT 0,
                repeat_mode TEXT NOT NULL DEFAULT 'off',
                volume INTEGER NOT NULL DEFAULT 100,
                last_played_song_id INTEGER,
                last_playlist_id INTEGER
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_playlist_songs ON playlist_songs(playlist_id, position)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_play_history_user ON play_history(user_id, played_date)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ── Song Operations ────────────────────────────────────────────

    pub async fn insert_song(&self, song: &models::NewSong) -> anyhow::Result<models::Song> {
        let row = sqlx::query_as::<_, models::Song>(
            r#"
            INSERT INTO songs (title, artist, album, duration, file_id, thumbnail_file_id,
                               storage_message_id, uploaded_by, genre, year)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(song.duration)
        .bind(&song.file_id)
        .bind(&song.thumbnail_file_id)
        .bind(song.storage_message_id)
        .bind(song.uploaded_by)
        .bind(&song.genre)
        .bind(song.year)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_song(&self, id: i64) -> anyhow::Result<Option<models::Song>> {
        let song = sqlx::query_as::<_, models::Song>("SELECT * FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(song)
    }

    /// Page of songs, newest first. `search` is a case-insensitive substring
    /// match over title or artist (SQLite LIKE is case-insensitive for ASCII).
    pub async fn list_songs(
        &self,
        limit: i64,
        offset: i64,
        search: Option<&str>,
    ) -> anyhow::Result<Vec<models::Song>> {
        let songs = match search {
            Some(q) if !q.is_empty() => {
                sqlx::query_as::<_, models::Song>(
                    r#"SELECT * FROM songs
                       WHERE title LIKE ?1 OR artist LIKE ?1
                       ORDER BY upload_date DESC LIMIT ?2 OFFSET ?3"#,
                )
                .bind(format!("%{q}%"))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, models::Song>(
                    "SELECT * FROM songs ORDER BY upload_date DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(songs)
    }

    pub async fn count_songs(&self, search: Option<&str>) -> anyhow::Result<i64> {
        let row: (i64,) = match search {
            Some(q) if !q.is_empty() => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM songs WHERE title LIKE ?1 OR artist LIKE ?1",
                )
                .bind(format!("%{q}%"))
                .fetch_one(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as("SELECT COUNT(*) FROM songs")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(row.0)
    }

    pub async fn increment_play_count(&self, song_id: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE songs SET play_count = play_count + 1 WHERE id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_song(&self, song_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Favorite Operations ────────────────────────────────────────

    pub async fn get_favorite(&self, user_id: i64, song_id: i64) -> anyhow::Result<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM favorites WHERE user_id = ? AND song_id = ?")
                .bind(user_id)
                .bind(song_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn add_favorite(&self, user_id: i64, song_id: i64) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO favorites (user_id, song_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove_favorite(&self, favorite_id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM favorites WHERE id = ?")
            .bind(favorite_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn favorites_for_user(&self, user_id: i64) -> anyhow::Result<Vec<models::Song>> {
        let songs = sqlx::query_as::<_, models::Song>(
            r#"SELECT s.* FROM songs s
               JOIN favorites f ON s.id = f.song_id
               WHERE f.user_id = ?
               ORDER BY f.added_date DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(songs)
    }

    pub async fn count_favorites(&self, user_id: i64) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    // ── Playlist Operations ────────────────────────────────────────

    pub async fn insert_playlist(
        &self,
        user_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> anyhow::Result<models::Playlist> {
        let playlist = sqlx::query_as::<_, models::Playlist>(
            "INSERT INTO playlists (user_id, name, description) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(playlist)
    }

    pub async fn get_playlist(&self, id: i64) -> anyhow::Result<Option<models::Playlist>> {
        let playlist =
            sqlx::query_as::<_, models::Playlist>("SELECT * FROM playlists WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(playlist)
    }

    pub async fn playlists_for_user(&self, user_id: i64) -> anyhow::Result<Vec<models::Playlist>> {
        let playlists = sqlx::query_as::<_, models::Playlist>(
            "SELECT * FROM playlists WHERE user_id = ? ORDER BY created_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(playlists)
    }

    /// Songs of a playlist in explicit position order.
    pub async fn playlist_songs(&self, playlist_id: i64) -> anyhow::Result<Vec<models::Song>> {
        let songs = sqlx::query_as::<_, models::Song>(
            r#"SELECT s.* FROM songs s
               JOIN playlist_songs ps ON s.id = ps.song_id
               WHERE ps.playlist_id = ?
               ORDER BY ps.position"#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(songs)
    }

    pub async fn max_position(&self, playlist_id: i64) -> anyhow::Result<i64> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(position) FROM playlist_songs WHERE playlist_id = ?")
                .bind(playlist_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0.unwrap_or(0))
    }

    pub async fn insert_playlist_song(
        &self,
        playlist_id: i64,
        song_id: i64,
        position: i64,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO playlist_songs (playlist_id, song_id, position) VALUES (?, ?, ?)")
            .bind(playlist_id)
            .bind(song_id)
            .bind(position)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_playlists(&self, user_id: i64) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM playlists WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    // ── History & Stats Operations ─────────────────────────────────

    pub async fn insert_play(&self, user_id: i64, song_id: i64) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO play_history (user_id, song_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_plays(&self, user_id: i64) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM play_history WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn count_uploads(&self, user_id: i64) -> anyhow::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM songs WHERE uploaded_by = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn top_songs_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<models::TopSong>> {
        let songs = sqlx::query_as::<_, models::TopSong>(
            r#"SELECT s.title, s.artist, COUNT(*) as plays
               FROM play_history ph
               JOIN songs s ON ph.song_id = s.id
               WHERE ph.user_id = ?
               GROUP BY s.id
               ORDER BY plays DESC LIMIT ?"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(songs)
    }

    // ── Preference Operations ──────────────────────────────────────

    pub async fn get_preferences(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Option<models::UserPreferences>> {
        let prefs = sqlx::query_as::<_, models::UserPreferences>(
            "SELECT * FROM user_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prefs)
    }

    pub async fn upsert_last_played(
        &self,
        user_id: i64,
        song_id: i64,
        playlist_id: Option<i64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, last_played_song_id, last_playlist_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id) DO UPDATE
            SET last_played_song_id = ?2,
                last_playlist_id = COALESCE(?3, user_preferences.last_playlist_id)
            "#,
        )
        .bind(user_id)
        .bind(song_id)
        .bind(playlist_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
