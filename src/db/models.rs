use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: i64,
    pub file_id: String,
    pub thumbnail_file_id: Option<String>,
    pub storage_message_id: Option<i64>,
    pub uploaded_by: i64,
    pub upload_date: NaiveDateTime,
    pub play_count: i64,
    pub genre: Option<String>,
    pub year: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_date: NaiveDateTime,
    pub is_public: bool,
}

/// A playlist with its ordered song list embedded, as returned by the
/// playlists endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistWithSongs {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: i64,
    pub shuffle: bool,
    pub repeat_mode: String,
    pub volume: i64,
    pub last_played_song_id: Option<i64>,
    pub last_playlist_id: Option<i64>,
}

/// One row of the per-user "most played" ranking.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TopSong {
    pub title: String,
    pub artist: Option<String>,
    pub plays: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(rename = "totalSongs")]
    pub total_songs: i64,
    #[serde(rename = "totalPlays")]
    pub total_plays: i64,
    #[serde(rename = "totalPlaylists")]
    pub total_playlists: i64,
    #[serde(rename = "totalFavorites")]
    pub total_favorites: i64,
    #[serde(rename = "topSongs")]
    pub top_songs: Vec<TopSong>,
}

/// Fields captured from an incoming upload before the row exists.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: i64,
    pub file_id: String,
    pub thumbnail_file_id: Option<String>,
    pub storage_message_id: Option<i64>,
    pub uploaded_by: i64,
    pub genre: Option<String>,
    pub year: Option<i64>,
}
