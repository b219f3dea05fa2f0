use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode,
};
use teloxide::utils::markdown::escape;

use crate::bot::callbacks::CallbackAction;
use crate::bot::session::ChatState;
use crate::bot::AppState;
use crate::db::models::{NewSong, Song};
use crate::util::{format_duration, is_audio_mime, metadata_from_filename, truncate};

pub const MENU_BROWSE: &str = "🎵 Browse Songs";
pub const MENU_UPLOAD: &str = "📤 Upload Song";
pub const MENU_PLAYLISTS: &str = "🎼 My Playlists";
pub const MENU_FAVORITES: &str = "❤️ Favorites";
pub const MENU_SEARCH: &str = "🔍 Search";
pub const MENU_AI_CHAT: &str = "💬 Chat with AI";
pub const MENU_STATS: &str = "📊 Stats";

/// Songs per page in chat display (the web list uses 20).
const BOT_PAGE_SIZE: i64 = 10;
const BOT_TOP_SONGS: i64 = 5;

/// Main handler for non-command messages: audio uploads, menu taps, and
/// free text dispatched by conversation state.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
    let chat_id = msg.chat.id;

    // Audio (or audio document) is always treated as an upload.
    if msg.audio().is_some() || is_audio_document(&msg) {
        handle_audio_upload(&bot, &msg, user_id, &state).await?;
        return Ok(());
    }

    let text = match msg.text() {
        Some(text) => text,
        None => return Ok(()),
    };

    // Menu taps map onto the same operations as the commands.
    match text {
        MENU_BROWSE => return send_browse_page(&bot, chat_id, 1, &state).await,
        MENU_PLAYLISTS => return send_playlists(&bot, chat_id, user_id, &state).await,
        MENU_FAVORITES => return send_favorites(&bot, chat_id, user_id, &state).await,
        MENU_STATS => return send_stats(&bot, chat_id, user_id, &state).await,
        MENU_UPLOAD => {
            bot.send_message(
                chat_id,
                "📤 Send an audio file (MP3/M4A/WAV) to upload.\n\n\
                 Files with proper metadata (title, artist) work best.",
            )
            .await?;
            state.sessions.set(user_id, ChatState::WaitingUpload);
            return Ok(());
        }
        MENU_SEARCH => {
            bot.send_message(chat_id, "🔍 Type a song title or artist to search for:")
                .await?;
            state.sessions.set(user_id, ChatState::Searching);
            return Ok(());
        }
        MENU_AI_CHAT => {
            bot.send_message(
                chat_id,
                "🤖 Ask me anything about music!\n\n\
                 For example:\n\
                 - \"Tell me about The Beatles\"\n\
                 - \"What genre fits a rainy evening?\"\n\
                 - \"Who are the great jazz singers?\"",
            )
            .await?;
            state.sessions.set(user_id, ChatState::AiChat);
            return Ok(());
        }
        _ => {}
    }

    // Free text: dispatch on the current conversation state.
    match state.sessions.get(user_id) {
        ChatState::Searching => {
            send_search_results(&bot, chat_id, text, &state).await?;
            state.sessions.clear(user_id);
        }
        ChatState::AiChat => {
            // Multi-turn: the state stays set until another flow replaces it.
            bot.send_chat_action(chat_id, ChatAction::Typing).await?;
            let reply = state.gemini.chat(text, "").await;
            bot.send_message(chat_id, reply).await?;
        }
        ChatState::CreatingPlaylist => {
            let playlist = state.service.create_playlist(user_id, text.trim(), None).await?;
            bot.send_message(chat_id, format!("✅ Playlist \"{}\" created!", playlist.name))
                .await?;
            state.sessions.clear(user_id);
        }
        ChatState::WaitingUpload => {
            bot.send_message(chat_id, "📤 Waiting for an audio file — send one, or /start to cancel.")
                .await?;
        }
        ChatState::Idle => {}
    }

    Ok(())
}

fn is_audio_document(msg: &Message) -> bool {
    msg.document()
        .and_then(|doc| doc.mime_type.as_ref())
        .map(|mime| is_audio_mime(mime.as_ref()))
        .unwrap_or(false)
}

/// Store an incoming audio file: copy it into the storage chat, insert the
/// song row, and confirm. Falls back to the incoming file_id when the copy
/// into the blob chat fails.
async fn handle_audio_upload(
    bot: &Bot,
    msg: &Message,
    user_id: i64,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    let (incoming_file_id, file_name, meta_title, meta_artist, duration, thumbnail) =
        if let Some(audio) = msg.audio() {
            (
                audio.file.id.clone(),
                audio.file_name.clone(),
                audio.title.clone(),
                audio.performer.clone(),
                audio.duration.seconds() as i64,
                audio.thumbnail.as_ref().map(|t| t.file.id.clone()),
            )
        } else if let Some(doc) = msg.document() {
            (doc.file.id.clone(), doc.file_name.clone(), None, None, 0, None)
        } else {
            return Ok(());
        };

    bot.send_message(chat_id, "📤 Uploading song...").await?;

    // Telegram metadata wins; otherwise fall back to "Artist - Title.ext".
    let (name_artist, name_title) =
        metadata_from_filename(file_name.as_deref().unwrap_or("Unknown Title"));
    let title = meta_title.unwrap_or(name_title);
    let artist = meta_artist.or(name_artist);

    let caption = match &artist {
        Some(artist) => format!("{artist} - {title}"),
        None => title.clone(),
    };

    let (file_id, storage_message_id) = match state
        .storage
        .upload(InputFile::file_id(incoming_file_id.clone()), &caption)
        .await
    {
        Ok((stored_id, message_id)) => (stored_id, Some(message_id.0 as i64)),
        Err(e) => {
            tracing::warn!("Copy to storage chat failed, keeping original file_id: {}", e);
            (incoming_file_id, None)
        }
    };

    let song = state
        .service
        .upload_song(NewSong {
            title,
            artist,
            album: None,
            duration,
            file_id,
            thumbnail_file_id: thumbnail,
            storage_message_id,
            uploaded_by: user_id,
            genre: None,
            year: None,
        })
        .await?;

    state.sessions.clear(user_id);

    bot.send_message(
        chat_id,
        format!(
            "✅ Song uploaded!\n\n🎵 {}\n🎤 {}\n⏱ {}",
            song.title,
            song.artist.as_deref().unwrap_or("Unknown Artist"),
            format_duration(song.duration),
        ),
    )
    .await?;

    Ok(())
}

// ── Shared display operations (used by commands, menu taps and callbacks) ──

/// One MarkdownV2-safe list entry: "N. *Title*" plus the artist line.
fn song_entry(index: i64, song: &Song) -> String {
    format!(
        "{}\\. *{}*\n   🎤 {}\n\n",
        index,
        escape(&song.title),
        escape(song.artist.as_deref().unwrap_or("Unknown Artist")),
    )
}

pub async fn send_browse_page(
    bot: &Bot,
    chat_id: ChatId,
    page: i64,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let song_page = state.service.browse(page, BOT_PAGE_SIZE, None).await?;

    if song_page.songs.is_empty() {
        bot.send_message(chat_id, "📭 No songs yet. Upload the first one!")
            .await?;
        return Ok(());
    }

    let offset = (song_page.page - 1) * song_page.limit;
    let mut message = format!(
        "🎵 *Songs* \\(page {}/{}\\):\n\n",
        song_page.page, song_page.total_pages
    );
    let mut buttons = Vec::new();

    for (index, song) in song_page.songs.iter().enumerate() {
        message.push_str(&format!(
            "{}\\. *{}*\n   🎤 {}\n   💿 {}\n   ▶️ {} plays\n\n",
            offset + index as i64 + 1,
            escape(&song.title),
            escape(song.artist.as_deref().unwrap_or("Unknown Artist")),
            escape(song.album.as_deref().unwrap_or("-")),
            song.play_count,
        ));
        buttons.push(vec![InlineKeyboardButton::callback(
            format!("▶️ {}", truncate(&song.title, 25)),
            CallbackAction::Play(song.id).encode(),
        )]);
    }

    let mut nav = Vec::new();
    if song_page.page > 1 {
        nav.push(InlineKeyboardButton::callback(
            "⬅️ Prev",
            CallbackAction::BrowsePage(song_page.page - 1).encode(),
        ));
    }
    if song_page.page < song_page.total_pages {
        nav.push(InlineKeyboardButton::callback(
            "Next ➡️",
            CallbackAction::BrowsePage(song_page.page + 1).encode(),
        ));
    }
    if !nav.is_empty() {
        buttons.push(nav);
    }

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(InlineKeyboardMarkup::new(buttons))
        .await?;

    Ok(())
}

pub async fn send_search_results(
    bot: &Bot,
    chat_id: ChatId,
    query: &str,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let results = state.service.browse(1, BOT_PAGE_SIZE, Some(query)).await?;

    if results.songs.is_empty() {
        bot.send_message(chat_id, format!("🔍 No songs found for: \"{query}\""))
            .await?;
        return Ok(());
    }

    let mut message = format!("🔍 *Results for \"{}\":*\n\n", escape(query));
    let mut buttons = Vec::new();

    for (index, song) in results.songs.iter().enumerate() {
        message.push_str(&song_entry(index as i64 + 1, song));
        buttons.push(vec![InlineKeyboardButton::callback(
            format!("▶️ {}", truncate(&song.title, 25)),
            CallbackAction::Play(song.id).encode(),
        )]);
    }

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(InlineKeyboardMarkup::new(buttons))
        .await?;

    Ok(())
}

pub async fn send_playlists(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let playlists = state.service.playlists_with_songs(user_id).await?;

    if playlists.is_empty() {
        bot.send_message(chat_id, "📝 You have no playlists yet.\n\nCreate your first one?")
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::callback(
                    "➕ Create Playlist",
                    CallbackAction::CreatePlaylist.encode(),
                ),
            ]]))
            .await?;
        return Ok(());
    }

    let mut message = String::from("🎼 *Your playlists:*\n\n");
    let mut buttons = Vec::new();

    for entry in &playlists {
        message.push_str(&format!(
            "📁 *{}*\n   {} songs\n",
            escape(&entry.playlist.name),
            entry.songs.len()
        ));
        if let Some(description) = &entry.playlist.description {
            message.push_str(&format!("   {}\n", escape(description)));
        }
        message.push('\n');

        buttons.push(vec![InlineKeyboardButton::callback(
            format!("▶️ {}", truncate(&entry.playlist.name, 25)),
            CallbackAction::ShowPlaylist(entry.playlist.id).encode(),
        )]);
    }

    buttons.push(vec![InlineKeyboardButton::callback(
        "➕ New Playlist",
        CallbackAction::CreatePlaylist.encode(),
    )]);

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(InlineKeyboardMarkup::new(buttons))
        .await?;

    Ok(())
}

pub async fn send_favorites(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let favorites = state.service.favorites(user_id).await?;

    if favorites.is_empty() {
        bot.send_message(chat_id, "💔 No favorite songs yet. Go add some!")
            .await?;
        return Ok(());
    }

    let mut message = format!("❤️ *Favorite songs \\({}\\):*\n\n", favorites.len());
    let mut buttons = Vec::new();

    for (index, song) in favorites.iter().enumerate() {
        message.push_str(&song_entry(index as i64 + 1, song));
        buttons.push(vec![InlineKeyboardButton::callback(
            format!("▶️ {}", truncate(&song.title, 25)),
            CallbackAction::Play(song.id).encode(),
        )]);
    }

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(InlineKeyboardMarkup::new(buttons))
        .await?;

    Ok(())
}

pub async fn send_stats(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let stats = state.service.stats(user_id, BOT_TOP_SONGS).await?;

    let mut message = String::from("📊 *Your stats:*\n\n");
    message.push_str(&format!("📤 Songs uploaded: {}\n", stats.total_songs));
    message.push_str(&format!("▶️ Total plays: {}\n", stats.total_plays));
    message.push_str(&format!("🎼 Playlists: {}\n", stats.total_playlists));
    message.push_str(&format!("❤️ Favorites: {}\n\n", stats.total_favorites));

    if !stats.top_songs.is_empty() {
        message.push_str("*🔥 Most played:*\n");
        for (index, song) in stats.top_songs.iter().enumerate() {
            message.push_str(&format!(
                "{}\\. {} \\- {} \\({}x\\)\n",
                index + 1,
                escape(&song.title),
                escape(song.artist.as_deref().unwrap_or("Unknown Artist")),
                song.plays,
            ));
        }
    }

    bot.send_message(chat_id, message)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song_named(title: &str, artist: &str) -> Song {
        Song {
            id: 1,
            title: title.to_string(),
            artist: Some(artist.to_string()),
            album: None,
            duration: 180,
            file_id: "f".to_string(),
            thumbnail_file_id: None,
            storage_message_id: None,
            uploaded_by: 1,
            upload_date: chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc(),
            play_count: 0,
            genre: None,
            year: None,
        }
    }

    #[test]
    fn song_entries_escape_markdown_specials() {
        let entry = song_entry(1, &song_named("What's Up? (Remix)", "P!nk"));

        assert!(entry.starts_with("1\\."));
        assert!(entry.contains("\\(Remix\\)"));
        assert!(entry.contains("P\\!nk"));
    }

    #[test]
    fn plain_titles_pass_through_unchanged() {
        let entry = song_entry(2, &song_named("Hey Jude", "The Beatles"));
        assert!(entry.contains("*Hey Jude*"));
        assert!(entry.contains("The Beatles"));
    }
}
