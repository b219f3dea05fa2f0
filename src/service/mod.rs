use serde::Serialize;

use crate::db::models::{NewSong, Playlist, PlaylistWithSongs, Song, UserStats};
use crate::db::Database;

/// Shared application service. Both frontends (REST handlers and bot
/// handlers) go through this layer instead of duplicating queries.
#[derive(Debug, Clone)]
pub struct MusicService {
    db: Database,
}

/// One page of the song catalog.
#[derive(Debug, Clone, Serialize)]
pub struct SongPage {
    pub songs: Vec<Song>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Added,
    Removed,
}

impl ToggleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleAction::Added => "added",
            ToggleAction::Removed => "removed",
        }
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

impl MusicService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ── Catalog ────────────────────────────────────────────────────

    pub async fn upload_song(&self, song: NewSong) -> anyhow::Result<Song> {
        let song = self.db.insert_song(&song).await?;
        tracing::info!("Song {} uploaded by user {}", song.id, song.uploaded_by);
        Ok(song)
    }

    pub async fn song(&self, id: i64) -> anyhow::Result<Option<Song>> {
        self.db.get_song(id).await
    }

    /// Delete a song row. Returns the removed song (for storage cleanup), or
    /// None when it never existed.
    pub async fn delete_song(&self, id: i64) -> anyhow::Result<Option<Song>> {
        match self.db.get_song(id).await? {
            Some(song) => {
                self.db.delete_song(id).await?;
                tracing::info!("Song {} deleted", id);
                Ok(Some(song))
            }
            None => Ok(None),
        }
    }

    /// Paginated browse/search. `page` is 1-based and clamped to >= 1.
    pub async fn browse(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
    ) -> anyhow::Result<SongPage> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = (page - 1) * limit;

        let songs = self.db.list_songs(limit, offset, search).await?;
        let total = self.db.count_songs(search).await?;

        Ok(SongPage {
            songs,
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        })
    }

    /// Record one play: bump the counter, append one history row, remember
    /// the last-played song. Returns false when the song does not exist.
    pub async fn record_play(&self, user_id: i64, song_id: i64) -> anyhow::Result<bool> {
        if self.db.get_song(song_id).await?.is_none() {
            return Ok(false);
        }
        self.db.increment_play_count(song_id).await?;
        self.db.insert_play(user_id, song_id).await?;
        self.db.upsert_last_played(user_id, song_id, None).await?;
        Ok(true)
    }

    // ── Favorites ──────────────────────────────────────────────────

    pub async fn toggle_favorite(
        &self,
        user_id: i64,
        song_id: i64,
    ) -> anyhow::Result<ToggleAction> {
        match self.db.get_favorite(user_id, song_id).await? {
            Some(favorite_id) => {
                self.db.remove_favorite(favorite_id).await?;
                Ok(ToggleAction::Removed)
            }
            None => {
                self.db.add_favorite(user_id, song_id).await?;
                Ok(ToggleAction::Added)
            }
        }
    }

    pub async fn is_favorite(&self, user_id: i64, song_id: i64) -> anyhow::Result<bool> {
        Ok(self.db.get_favorite(user_id, song_id).await?.is_some())
    }

    pub async fn favorites(&self, user_id: i64) -> anyhow::Result<Vec<Song>> {
        self.db.favorites_for_user(user_id).await
    }

    // ── Playlists ──────────────────────────────────────────────────

    pub async fn create_playlist(
        &self,
        user_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Playlist> {
        let playlist = self.db.insert_playlist(user_id, name, description).await?;
        tracing::info!("Playlist {} created by user {}", playlist.id, user_id);
        Ok(playlist)
    }

    pub async fn playlist(&self, id: i64) -> anyhow::Result<Option<Playlist>> {
        self.db.get_playlist(id).await
    }

    pub async fn playlist_songs(&self, playlist_id: i64) -> anyhow::Result<Vec<Song>> {
        self.db.playlist_songs(playlist_id).await
    }

    pub async fn playlists_with_songs(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Vec<PlaylistWithSongs>> {
        let playlists = self.db.playlists_for_user(user_id).await?;
        let mut result = Vec::with_capacity(playlists.len());
        for playlist in playlists {
            let songs = self.db.playlist_songs(playlist.id).await?;
            result.push(PlaylistWithSongs { playlist, songs });
        }
        Ok(result)
    }

    /// Append a song at position max+1. Returns the assigned position, or
    /// None when the playlist or the song does not exist.
    pub async fn add_to_playlist(
        &self,
        playlist_id: i64,
        song_id: i64,
    ) -> anyhow::Result<Option<i64>> {
        if self.db.get_playlist(playlist_id).await?.is_none()
            || self.db.get_song(song_id).await?.is_none()
        {
            return Ok(None);
        }
        let position = self.db.max_position(playlist_id).await? + 1;
        self.db
            .insert_playlist_song(playlist_id, song_id, position)
            .await?;
        Ok(Some(position))
    }

    // ── Stats ──────────────────────────────────────────────────────

    pub async fn stats(&self, user_id: i64, top_limit: i64) -> anyhow::Result<UserStats> {
        Ok(UserStats {
            total_songs: self.db.count_uploads(user_id).await?,
            total_plays: self.db.count_plays(user_id).await?,
            total_playlists: self.db.count_playlists(user_id).await?,
            total_favorites: self.db.count_favorites(user_id).await?,
            top_songs: self.db.top_songs_for_user(user_id, top_limit).await?,
        })
    }

    pub async fn last_played(&self, user_id: i64) -> anyhow::Result<Option<Song>> {
        let prefs = self.db.get_preferences(user_id).await?;
        match prefs.and_then(|p| p.last_played_song_id) {
            Some(song_id) => self.db.get_song(song_id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::metadata_from_filename;

    async fn service() -> MusicService {
        MusicService::new(Database::connect_in_memory().await.unwrap())
    }

    fn new_song(title: &str, artist: &str, uploader: i64) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: if artist.is_empty() {
                None
            } else {
                Some(artist.to_string())
            },
            album: None,
            duration: 180,
            file_id: format!("file-{title}"),
            thumbnail_file_id: None,
            storage_message_id: None,
            uploaded_by: uploader,
            genre: None,
            year: None,
        }
    }

    #[test]
    fn pagination_arithmetic() {
        assert_eq!(total_pages(45, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(10, 0), 0);
    }

    #[tokio::test]
    async fn browse_pages_split_at_limit() {
        let svc = service().await;
        for i in 0..45 {
            svc.upload_song(new_song(&format!("Song {i}"), "Various", 1))
                .await
                .unwrap();
        }

        let page1 = svc.browse(1, 20, None).await.unwrap();
        assert_eq!(page1.songs.len(), 20);
        assert_eq!(page1.total, 45);
        assert_eq!(page1.total_pages, 3);

        let page3 = svc.browse(3, 20, None).await.unwrap();
        assert_eq!(page3.songs.len(), 5);
        assert_eq!(page3.page, 3);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_title_and_artist() {
        let svc = service().await;
        svc.upload_song(new_song("Beat It", "Michael Jackson", 1))
            .await
            .unwrap();
        svc.upload_song(new_song("Let It Be", "The Beatles", 1))
            .await
            .unwrap();
        svc.upload_song(new_song("Smoke on the Water", "Deep Purple", 1))
            .await
            .unwrap();

        let hits = svc.browse(1, 20, Some("beat")).await.unwrap();
        assert_eq!(hits.total, 2);
        let titles: Vec<_> = hits.songs.iter().map(|s| s.title.as_str()).collect();
        assert!(titles.contains(&"Beat It"));
        assert!(titles.contains(&"Let It Be"));
    }

    #[tokio::test]
    async fn favorite_toggle_is_pairwise_idempotent() {
        let svc = service().await;
        let song = svc.upload_song(new_song("Y.M.C.A.", "Village People", 7)).await.unwrap();

        assert_eq!(
            svc.toggle_favorite(7, song.id).await.unwrap(),
            ToggleAction::Added
        );
        assert!(svc.is_favorite(7, song.id).await.unwrap());

        assert_eq!(
            svc.toggle_favorite(7, song.id).await.unwrap(),
            ToggleAction::Removed
        );
        assert!(!svc.is_favorite(7, song.id).await.unwrap());
        assert!(svc.favorites(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_play_increments_once_and_appends_one_row() {
        let svc = service().await;
        let song = svc.upload_song(new_song("Hey Jude", "The Beatles", 3)).await.unwrap();

        assert!(svc.record_play(3, song.id).await.unwrap());
        assert!(svc.record_play(3, song.id).await.unwrap());

        let reloaded = svc.song(song.id).await.unwrap().unwrap();
        assert_eq!(reloaded.play_count, 2);

        let stats = svc.stats(3, 10).await.unwrap();
        assert_eq!(stats.total_plays, 2);
        assert_eq!(stats.top_songs.len(), 1);
        assert_eq!(stats.top_songs[0].plays, 2);

        let last = svc.last_played(3).await.unwrap().unwrap();
        assert_eq!(last.id, song.id);
    }

    #[tokio::test]
    async fn record_play_on_missing_song_is_rejected() {
        let svc = service().await;
        assert!(!svc.record_play(3, 999).await.unwrap());
        assert_eq!(svc.stats(3, 10).await.unwrap().total_plays, 0);
    }

    #[tokio::test]
    async fn delete_song_removes_the_row() {
        let svc = service().await;
        let song = svc.upload_song(new_song("Gone", "X", 1)).await.unwrap();

        let deleted = svc.delete_song(song.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, song.id);
        assert!(svc.song(song.id).await.unwrap().is_none());
        assert!(svc.delete_song(song.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn playlist_positions_are_appended_max_plus_one() {
        let svc = service().await;
        let a = svc.upload_song(new_song("A", "X", 1)).await.unwrap();
        let b = svc.upload_song(new_song("B", "X", 1)).await.unwrap();
        let playlist = svc.create_playlist(1, "Mix", None).await.unwrap();

        assert_eq!(svc.add_to_playlist(playlist.id, a.id).await.unwrap(), Some(1));
        assert_eq!(svc.add_to_playlist(playlist.id, b.id).await.unwrap(), Some(2));

        // A missing playlist or song yields no position.
        assert_eq!(svc.add_to_playlist(999, a.id).await.unwrap(), None);
        assert_eq!(svc.add_to_playlist(playlist.id, 999).await.unwrap(), None);

        let songs = svc.playlist_songs(playlist.id).await.unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].id, a.id);
        assert_eq!(songs[1].id, b.id);
    }

    #[tokio::test]
    async fn upload_then_playlist_end_to_end() {
        let svc = service().await;

        let (artist, title) = metadata_from_filename("Artist - Title.mp3");
        assert_eq!(artist.as_deref(), Some("Artist"));
        assert_eq!(title, "Title");

        let song = svc
            .upload_song(NewSong {
                title,
                artist,
                album: None,
                duration: 215,
                file_id: "tg-file-1".to_string(),
                thumbnail_file_id: None,
                storage_message_id: None,
                uploaded_by: 42,
                genre: None,
                year: None,
            })
            .await
            .unwrap();

        let playlist = svc.create_playlist(42, "Road Trip", None).await.unwrap();
        assert_eq!(
            svc.add_to_playlist(playlist.id, song.id).await.unwrap(),
            Some(1)
        );

        let playlists = svc.playlists_with_songs(42).await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].playlist.name, "Road Trip");
        assert_eq!(playlists[0].songs.len(), 1);
        assert_eq!(playlists[0].songs[0].artist.as_deref(), Some("Artist"));
        assert_eq!(playlists[0].songs[0].title, "Title");
    }
}
