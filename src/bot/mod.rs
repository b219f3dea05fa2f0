pub mod callbacks;
pub mod commands;
pub mod handlers;
pub mod session;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::prelude::*;

use crate::ai::gemini::GeminiClient;
use crate::service::MusicService;
use crate::storage::TelegramStorage;
use session::SessionStore;

/// Shared application state, accessible from all handlers.
pub struct AppState {
    pub service: MusicService,
    pub gemini: GeminiClient,
    pub storage: TelegramStorage,
    pub sessions: SessionStore,
}

/// Build the teloxide update handler tree.
pub fn build_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::BotCommand>()
        .endpoint(commands::handle_command);

    let callback_handler = Update::filter_callback_query()
        .endpoint(callbacks::handle_callback);

    let message_handler = Update::filter_message()
        .endpoint(handlers::handle_message);

    dptree::entry()
        .branch(command_handler)
        .branch(callback_handler)
        .branch(message_handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_tree_builds() {
        let _handler = build_handler();
    }
}
