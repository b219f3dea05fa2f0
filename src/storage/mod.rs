use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};

/// Blob storage backed by one dedicated Telegram chat: audio files are sent
/// there once, and the returned `file_id` is the only handle the rest of the
/// system keeps.
#[derive(Clone)]
pub struct TelegramStorage {
    bot: Bot,
    storage_chat_id: ChatId,
    bot_token: String,
}

impl TelegramStorage {
    pub fn new(bot: Bot, storage_chat_id: i64, bot_token: &str) -> Self {
        Self {
            bot,
            storage_chat_id: ChatId(storage_chat_id),
            bot_token: bot_token.to_string(),
        }
    }

    /// Upload an audio file to the storage chat. Returns the opaque file
    /// handle plus the storage message id (needed for deletion).
    pub async fn upload(
        &self,
        audio: InputFile,
        caption: &str,
    ) -> anyhow::Result<(String, MessageId)> {
        let mut request = self.bot.send_audio(self.storage_chat_id, audio);
        if !caption.is_empty() {
            request = request.caption(caption.to_string());
        }
        let message = request.await?;

        let file_id = message
            .audio()
            .map(|a| a.file.id.clone())
            .ok_or_else(|| anyhow::anyhow!("storage chat reply carried no audio"))?;

        Ok((file_id, message.id))
    }

    /// Resolve a file handle to a downloadable URL. The URL embeds the bot
    /// token and must never leave the server; the web layer proxies the bytes
    /// instead of handing this to browsers.
    pub async fn resolve(&self, file_id: &str) -> anyhow::Result<String> {
        let file = self.bot.get_file(file_id.to_string()).await?;
        Ok(format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot_token, file.path
        ))
    }

    /// Best-effort delete of a stored file's message.
    pub async fn delete(&self, message_id: MessageId) -> bool {
        match self.bot.delete_message(self.storage_chat_id, message_id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to delete storage message {}: {}", message_id.0, e);
                false
            }
        }
    }
}
