use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::ai::gemini::GeminiClient;
use crate::service::MusicService;
use crate::storage::TelegramStorage;

const WEB_TOP_SONGS: i64 = 10;

#[derive(Clone)]
pub struct WebState {
    pub service: MusicService,
    pub gemini: GeminiClient,
    pub storage: TelegramStorage,
    pub http: reqwest::Client,
}

pub fn create_router(state: WebState) -> Router {
    Router::new()
        .route("/api/songs", get(list_songs))
        .route("/api/songs/:id", get(get_song).delete(delete_song))
        .route("/api/playlists/:user_id", get(list_playlists))
        .route("/api/favorites/:user_id", get(list_favorites))
        .route("/api/play/:song_id", post(record_play))
        .route("/api/favorites/toggle", post(toggle_favorite))
        .route("/api/playlists", post(create_playlist))
        .route("/api/playlists/:id/songs", post(add_playlist_song))
        .route("/api/ai/lyrics", post(ai_lyrics))
        .route("/api/ai/recommend", post(ai_recommend))
        .route("/api/ai/info", post(ai_info))
        .route("/api/ai/chat", post(ai_chat))
        .route("/api/ai/translate", post(ai_translate))
        .route("/api/ai/analyze/:playlist_id", post(ai_analyze))
        .route("/api/stats/:user_id", get(get_stats))
        .route("/api/last-played/:user_id", get(get_last_played))
        .route("/api/stream/:song_id", get(stream_song))
        .fallback_service(ServeDir::new("public"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── JSON envelope helpers ──────────────────────────────────────────

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}

fn internal_error(err: anyhow::Error) -> Response {
    tracing::error!("Request failed: {:#}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}

// ── Song handlers ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SongsQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
}

async fn list_songs(State(state): State<WebState>, Query(q): Query<SongsQuery>) -> Response {
    let page = q.page.unwrap_or(1);
    let limit = q.limit.unwrap_or(20);

    match state.service.browse(page, limit, q.search.as_deref()).await {
        Ok(page) => ok(json!({
            "success": true,
            "data": page.songs,
            "pagination": {
                "page": page.page,
                "limit": page.limit,
                "total": page.total,
                "totalPages": page.total_pages,
            },
        })),
        Err(e) => internal_error(e),
    }
}

async fn get_song(State(state): State<WebState>, Path(id): Path<i64>) -> Response {
    match state.service.song(id).await {
        Ok(Some(song)) => ok(json!({ "success": true, "data": song })),
        Ok(None) => not_found("Song not found"),
        Err(e) => internal_error(e),
    }
}

/// Remove a song row and, best effort, its blob in the storage chat.
async fn delete_song(State(state): State<WebState>, Path(id): Path<i64>) -> Response {
    let song = match state.service.delete_song(id).await {
        Ok(Some(song)) => song,
        Ok(None) => return not_found("Song not found"),
        Err(e) => return internal_error(e),
    };

    if let Some(message_id) = song.storage_message_id {
        match i32::try_from(message_id) {
            Ok(id) => {
                state.storage.delete(teloxide::types::MessageId(id)).await;
            }
            Err(_) => {
                tracing::warn!(
                    "Storage message id {} does not fit a Telegram message id, skipping delete",
                    message_id
                );
            }
        }
    }

    ok(json!({ "success": true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayBody {
    user_id: i64,
}

async fn record_play(
    State(state): State<WebState>,
    Path(song_id): Path<i64>,
    Json(body): Json<PlayBody>,
) -> Response {
    match state.service.record_play(body.user_id, song_id).await {
        Ok(true) => ok(json!({ "success": true })),
        Ok(false) => not_found("Song not found"),
        Err(e) => internal_error(e),
    }
}

/// Server-side proxied download: resolves the Telegram file URL (which embeds
/// the bot token) and streams the bytes through, so the token never reaches
/// the browser.
async fn stream_song(State(state): State<WebState>, Path(song_id): Path<i64>) -> Response {
    let song = match state.service.song(song_id).await {
        Ok(Some(song)) => song,
        Ok(None) => return not_found("Song not found"),
        Err(e) => return internal_error(e),
    };

    let url = match state.storage.resolve(&song.file_id).await {
        Ok(url) => url,
        Err(e) => return internal_error(e),
    };

    let upstream = match state.http.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            return internal_error(anyhow::anyhow!(
                "upstream file fetch failed with status {}",
                resp.status()
            ))
        }
        Err(e) => return internal_error(e.into()),
    };

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("audio/mpeg")
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|e| internal_error(e.into()))
}

// ── Favorite handlers ──────────────────────────────────────────────

async fn list_favorites(State(state): State<WebState>, Path(user_id): Path<i64>) -> Response {
    match state.service.favorites(user_id).await {
        Ok(songs) => ok(json!({ "success": true, "data": songs })),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody {
    user_id: i64,
    song_id: i64,
}

async fn toggle_favorite(
    State(state): State<WebState>,
    Json(body): Json<ToggleBody>,
) -> Response {
    match state.service.toggle_favorite(body.user_id, body.song_id).await {
        Ok(action) => ok(json!({ "success": true, "action": action.as_str() })),
        Err(e) => internal_error(e),
    }
}

// ── Playlist handlers ──────────────────────────────────────────────

async fn list_playlists(State(state): State<WebState>, Path(user_id): Path<i64>) -> Response {
    match state.service.playlists_with_songs(user_id).await {
        Ok(playlists) => ok(json!({ "success": true, "data": playlists })),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlaylistBody {
    user_id: i64,
    name: String,
    description: Option<String>,
}

async fn create_playlist(
    State(state): State<WebState>,
    Json(body): Json<CreatePlaylistBody>,
) -> Response {
    match state
        .service
        .create_playlist(body.user_id, &body.name, body.description.as_deref())
        .await
    {
        Ok(playlist) => ok(json!({ "success": true, "data": playlist })),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddSongBody {
    song_id: i64,
}

async fn add_playlist_song(
    State(state): State<WebState>,
    Path(playlist_id): Path<i64>,
    Json(body): Json<AddSongBody>,
) -> Response {
    match state.service.add_to_playlist(playlist_id, body.song_id).await {
        Ok(Some(position)) => ok(json!({ "success": true, "data": { "position": position } })),
        Ok(None) => not_found("Playlist or song not found"),
        Err(e) => internal_error(e),
    }
}

// ── AI passthrough handlers ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SongRefBody {
    title: String,
    #[serde(default)]
    artist: String,
}

async fn ai_lyrics(State(state): State<WebState>, Json(body): Json<SongRefBody>) -> Response {
    let lyrics = state.gemini.lyrics(&body.title, &body.artist).await;
    ok(json!({ "success": true, "data": lyrics }))
}

async fn ai_info(State(state): State<WebState>, Json(body): Json<SongRefBody>) -> Response {
    let info = state.gemini.song_info(&body.title, &body.artist).await;
    ok(json!({ "success": true, "data": info }))
}

#[derive(Debug, Deserialize)]
struct RecommendBody {
    #[serde(default)]
    genre: String,
    #[serde(default)]
    mood: String,
}

async fn ai_recommend(
    State(state): State<WebState>,
    Json(body): Json<RecommendBody>,
) -> Response {
    let recommendations = state.gemini.recommend(&body.genre, &body.mood).await;
    ok(json!({ "success": true, "data": recommendations }))
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    message: String,
    #[serde(default)]
    context: String,
}

async fn ai_chat(State(state): State<WebState>, Json(body): Json<ChatBody>) -> Response {
    let reply = state.gemini.chat(&body.message, &body.context).await;
    ok(json!({ "success": true, "data": reply }))
}

#[derive(Debug, Deserialize)]
struct TranslateBody {
    lyrics: String,
    #[serde(default)]
    language: String,
}

async fn ai_translate(
    State(state): State<WebState>,
    Json(body): Json<TranslateBody>,
) -> Response {
    let translated = state.gemini.translate_lyrics(&body.lyrics, &body.language).await;
    ok(json!({ "success": true, "data": translated }))
}

async fn ai_analyze(State(state): State<WebState>, Path(playlist_id): Path<i64>) -> Response {
    let songs = match state.service.playlist(playlist_id).await {
        Ok(Some(_)) => match state.service.playlist_songs(playlist_id).await {
            Ok(songs) => songs,
            Err(e) => return internal_error(e),
        },
        Ok(None) => return not_found("Playlist not found"),
        Err(e) => return internal_error(e),
    };

    let analysis = state.gemini.analyze_playlist(&songs).await;
    ok(json!({ "success": true, "data": analysis }))
}

// ── Stats handlers ─────────────────────────────────────────────────

async fn get_stats(State(state): State<WebState>, Path(user_id): Path<i64>) -> Response {
    match state.service.stats(user_id, WEB_TOP_SONGS).await {
        Ok(stats) => ok(json!({ "success": true, "data": stats })),
        Err(e) => internal_error(e),
    }
}

/// The song to resume with, from the user's saved preferences.
async fn get_last_played(State(state): State<WebState>, Path(user_id): Path<i64>) -> Response {
    match state.service.last_played(user_id).await {
        Ok(Some(song)) => ok(json!({ "success": true, "data": song })),
        Ok(None) => not_found("No last played song"),
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::models::NewSong;
    use crate::db::Database;

    async fn test_state() -> WebState {
        let config = AppConfig {
            telegram_bot_token: "123:test".to_string(),
            gemini_api_key: "test-key".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            database_url: "sqlite::memory:".to_string(),
            storage_chat_id: -100,
            port: 0,
        };
        let bot = teloxide::Bot::new(&config.telegram_bot_token);
        WebState {
            service: MusicService::new(Database::connect_in_memory().await.unwrap()),
            gemini: GeminiClient::with_api_base(&config, "http://127.0.0.1:1"),
            storage: TelegramStorage::new(bot, config.storage_chat_id, &config.telegram_bot_token),
            http: reqwest::Client::new(),
        }
    }

    // A storage message id outside the i32 range must not be truncated into a
    // valid-looking Telegram message id; the delete of the row still succeeds
    // and the blob cleanup is skipped.
    #[tokio::test]
    async fn delete_skips_blob_cleanup_on_oversized_message_id() {
        let state = test_state().await;
        let song = state
            .service
            .upload_song(NewSong {
                title: "Orphan".to_string(),
                artist: None,
                album: None,
                duration: 60,
                file_id: "tg-file".to_string(),
                thumbnail_file_id: None,
                storage_message_id: Some(i64::MAX),
                uploaded_by: 1,
                genre: None,
                year: None,
            })
            .await
            .unwrap();

        let response = delete_song(State(state.clone()), Path(song.id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.service.song(song.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_song_is_404() {
        let state = test_state().await;
        let response = delete_song(State(state), Path(999)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
