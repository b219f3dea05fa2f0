use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::utils::markdown::escape;

use crate::bot::session::ChatState;
use crate::bot::{handlers, AppState};
use crate::util::{format_duration, truncate};

/// Inline keyboard actions. The wire format is a closed vocabulary of
/// prefix-tagged strings, decoded once here at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Play(i64),
    BrowsePage(i64),
    ShowPlaylist(i64),
    ToggleFavorite(i64),
    Lyrics(i64),
    CreatePlaylist,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == "create_playlist" {
            return Some(Self::CreatePlaylist);
        }
        let (prefix, rest) = data.split_once('_').map(|(p, r)| (p, r))?;
        let id: i64 = rest.parse().ok()?;
        match prefix {
            "play" => Some(Self::Play(id)),
            "browse" => Some(Self::BrowsePage(id)),
            "playlist" => Some(Self::ShowPlaylist(id)),
            "fav" => Some(Self::ToggleFavorite(id)),
            "lyrics" => Some(Self::Lyrics(id)),
            _ => None,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Play(id) => format!("play_{id}"),
            Self::BrowsePage(page) => format!("browse_{page}"),
            Self::ShowPlaylist(id) => format!("playlist_{id}"),
            Self::ToggleFavorite(id) => format!("fav_{id}"),
            Self::Lyrics(id) => format!("lyrics_{id}"),
            Self::CreatePlaylist => "create_playlist".to_string(),
        }
    }
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let action = match q.data.as_deref().and_then(CallbackAction::parse) {
        Some(action) => action,
        None => {
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        }
    };

    let user_id = q.from.id.0 as i64;
    let chat_id = match q.message.as_ref() {
        Some(msg) => msg.chat().id,
        None => {
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        }
    };

    match action {
        CallbackAction::Play(song_id) => {
            bot.answer_callback_query(&q.id).await?;
            play_song(&bot, chat_id, user_id, song_id, &state).await?;
        }

        CallbackAction::BrowsePage(page) => {
            bot.answer_callback_query(&q.id).await?;
            handlers::send_browse_page(&bot, chat_id, page, &state).await?;
        }

        CallbackAction::ShowPlaylist(playlist_id) => {
            bot.answer_callback_query(&q.id).await?;
            show_playlist(&bot, chat_id, playlist_id, &state).await?;
        }

        CallbackAction::ToggleFavorite(song_id) => {
            let note = match state.service.toggle_favorite(user_id, song_id).await? {
                crate::service::ToggleAction::Added => "❤️ Added to favorites",
                crate::service::ToggleAction::Removed => "💔 Removed from favorites",
            };
            bot.answer_callback_query(&q.id).text(note).await?;
        }

        CallbackAction::Lyrics(song_id) => {
            bot.answer_callback_query(&q.id)
                .text("🎵 Looking up lyrics...")
                .await?;
            match state.service.song(song_id).await? {
                Some(song) => {
                    let artist = song.artist.as_deref().unwrap_or("");
                    let lyrics = state.gemini.lyrics(&song.title, artist).await;
                    bot.send_message(chat_id, lyrics).await?;
                }
                None => {
                    bot.send_message(chat_id, "❌ Song not found.").await?;
                }
            }
        }

        CallbackAction::CreatePlaylist => {
            bot.answer_callback_query(&q.id).await?;
            bot.send_message(chat_id, "📝 Send a name for the new playlist:")
                .await?;
            state.sessions.set(user_id, ChatState::CreatingPlaylist);
        }
    }

    Ok(())
}

/// Re-send the stored audio by file_id, record the play and attach
/// favorite/lyrics buttons.
async fn play_song(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    song_id: i64,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let song = match state.service.song(song_id).await? {
        Some(song) => song,
        None => {
            bot.send_message(chat_id, "❌ Song not found.").await?;
            return Ok(());
        }
    };

    state.service.record_play(user_id, song_id).await?;
    let is_favorite = state.service.is_favorite(user_id, song_id).await?;

    let fav_label = if is_favorite { "💔 Unfavorite" } else { "❤️ Favorite" };
    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            fav_label,
            CallbackAction::ToggleFavorite(song_id).encode(),
        ),
        InlineKeyboardButton::callback("📝 Lyrics", CallbackAction::Lyrics(song_id).encode()),
    ]]);

    let caption = format!(
        "🎵 {}\n🎤 {}\n💿 {}\n⏱ {} · ▶️ {} plays",
        song.title,
        song.artist.as_deref().unwrap_or("Unknown Artist"),
        song.album.as_deref().unwrap_or("-"),
        format_duration(song.duration),
        song.play_count + 1,
    );

    bot.send_audio(chat_id, InputFile::file_id(song.file_id.clone()))
        .caption(caption)
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

async fn show_playlist(
    bot: &Bot,
    chat_id: ChatId,
    playlist_id: i64,
    state: &AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let playlist = match state.service.playlist(playlist_id).await? {
        Some(playlist) => playlist,
        None => {
            bot.send_message(chat_id, "❌ Playlist not found.").await?;
            return Ok(());
        }
    };

    let songs = state.service.playlist_songs(playlist_id).await?;
    if songs.is_empty() {
        bot.send_message(chat_id, format!("📝 Playlist \"{}\" is still empty.", playlist.name))
            .await?;
        return Ok(());
    }

    let mut message = format!("🎼 *{}*\n", escape(&playlist.name));
    if let Some(description) = &playlist.description {
        message.push_str(&escape(description));
        message.push('\n');
    }
    message.push_str(&format!("\n{} songs:\n\n", songs.len()));

    let mut buttons = Vec::new();
    for (index, song) in songs.iter().enumerate() {
        message.push_str(&format!(
            "{}\\. {} \\- {}\n",
            index + 1,
            escape(&song.title),
            escape(song.artist.as_deref().unwrap_or("Unknown Artist"))
        ));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_closed_vocabulary() {
        assert_eq!(CallbackAction::parse("play_42"), Some(CallbackAction::Play(42)));
        assert_eq!(CallbackAction::parse("browse_3"), Some(CallbackAction::BrowsePage(3)));
        assert_eq!(
            CallbackAction::parse("playlist_7"),
            Some(CallbackAction::ShowPlaylist(7))
        );
        assert_eq!(CallbackAction::parse("fav_1"), Some(CallbackAction::ToggleFavorite(1)));
        assert_eq!(CallbackAction::parse("lyrics_9"), Some(CallbackAction::Lyrics(9)));
        assert_eq!(
            CallbackAction::parse("create_playlist"),
            Some(CallbackAction::CreatePlaylist)
        );
    }

    #[test]
    fn rejects_unknown_or_malformed_tags() {
        assert_eq!(CallbackAction::parse("noise"), None);
        assert_eq!(CallbackAction::parse("play_abc"), None);
        assert_eq!(CallbackAction::parse("shuffle_1"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }

    #[test]
    fn encode_round_trips() {
        for action in [
            CallbackAction::Play(12),
            CallbackAction::BrowsePage(2),
            CallbackAction::ShowPlaylist(5),
            CallbackAction::ToggleFavorite(8),
            CallbackAction::Lyrics(3),
            CallbackAction::CreatePlaylist,
        ] {
            assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
        }
    }
}
