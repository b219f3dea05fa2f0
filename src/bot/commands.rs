use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::utils::command::BotCommands;

use crate::bot::handlers;
use crate::bot::session::ChatState;
use crate::bot::AppState;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum BotCommand {
    #[command(description = "Start the bot and show the menu")]
    Start,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Browse all songs")]
    Browse,
    #[command(description = "Search songs by title or artist")]
    Search(String),
    #[command(description = "Upload a new song")]
    Upload,
    #[command(description = "Your playlists")]
    Playlists,
    #[command(description = "Your favorite songs")]
    Favorites,
    #[command(description = "Fetch lyrics for a song")]
    Lyrics(String),
    #[command(description = "Detailed info about a song")]
    Info(String),
    #[command(description = "Song recommendations")]
    Recommend(String),
    #[command(description = "Your listening stats")]
    Stats,
}

fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(handlers::MENU_BROWSE),
            KeyboardButton::new(handlers::MENU_UPLOAD),
        ],
        vec![
            KeyboardButton::new(handlers::MENU_PLAYLISTS),
            KeyboardButton::new(handlers::MENU_FAVORITES),
        ],
        vec![
            KeyboardButton::new(handlers::MENU_SEARCH),
            KeyboardButton::new(handlers::MENU_AI_CHAT),
        ],
        vec![KeyboardButton::new(handlers::MENU_STATS)],
    ])
    .resize_keyboard()
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: BotCommand,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
    let chat_id = msg.chat.id;

    match cmd {
        BotCommand::Start => {
            state.sessions.clear(user_id);
            bot.send_message(
                chat_id,
                "🎶 Welcome to the Music Player Bot!\n\n\
                 🎵 Browse & play music\n\
                 📤 Upload your own songs\n\
                 🎼 Create & manage playlists\n\
                 🤖 AI: lyrics, song info, recommendations\n\
                 ❤️ Save favorite songs\n\
                 🔍 Search with ease\n\n\
                 Use the menu below or type /help for all commands.",
            )
            .reply_markup(main_menu())
            .await?;
        }

        BotCommand::Help => {
            bot.send_message(chat_id, BotCommand::descriptions().to_string())
                .await?;
        }

        BotCommand::Browse => {
            handlers::send_browse_page(&bot, chat_id, 1, &state).await?;
        }

        BotCommand::Search(query) => {
            let query = query.trim();
            if query.is_empty() {
                bot.send_message(chat_id, "🔍 Type a song title or artist to search for:")
                    .await?;
                state.sessions.set(user_id, ChatState::Searching);
            } else {
                handlers::send_search_results(&bot, chat_id, query, &state).await?;
            }
        }

        BotCommand::Upload => {
            bot.send_message(
                chat_id,
                "📤 Send an audio file (MP3/M4A/WAV) to upload.\n\n\
                 Files with proper metadata (title, artist) work best.",
            )
            .await?;
            state.sessions.set(user_id, ChatState::WaitingUpload);
        }

        BotCommand::Playlists => {
            handlers::send_playlists(&bot, chat_id, user_id, &state).await?;
        }

        BotCommand::Favorites => {
            handlers::send_favorites(&bot, chat_id, user_id, &state).await?;
        }

        BotCommand::Lyrics(query) => {
            let query = query.trim();
            if query.is_empty() {
                bot.send_message(chat_id, "Usage: /lyrics <song title>").await?;
            } else {
                bot.send_message(chat_id, "🎵 Looking up lyrics...").await?;
                let lyrics = state.gemini.lyrics(query, "").await;
                bot.send_message(chat_id, lyrics).await?;
            }
        }

        BotCommand::Info(query) => {
            let query = query.trim();
            if query.is_empty() {
                bot.send_message(chat_id, "Usage: /info <song title>").await?;
            } else {
                bot.send_message(chat_id, "📊 Fetching info...").await?;
                let info = state.gemini.song_info(query, "").await;
                bot.send_message(chat_id, info).await?;
            }
        }

        BotCommand::Recommend(query) => {
            bot.send_message(chat_id, "🎵 Looking for recommendations...")
                .await?;
            let recommendations = state.gemini.recommend(query.trim(), "").await;
            bot.send_message(chat_id, recommendations).await?;
        }

        BotCommand::Stats => {
            handlers::send_stats(&bot, chat_id, user_id, &state).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_command() {
        let help = BotCommand::descriptions().to_string();
        for command in [
            "/start",
            "/help",
            "/browse",
            "/search",
            "/upload",
            "/playlists",
            "/favorites",
            "/lyrics",
            "/info",
            "/recommend",
            "/stats",
        ] {
            assert!(help.contains(command), "missing {command} in help text");
        }
    }
}
