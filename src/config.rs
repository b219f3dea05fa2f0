#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub database_url: String,

    /// Telegram chat ID of the dedicated storage chat used as the blob store.
    pub storage_chat_id: i64,

    /// Port the web API + mini-app listens on.
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN")?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")?,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/music.db?mode=rwc".to_string()),
            storage_chat_id: std::env::var("STORAGE_CHAT_ID")?.parse()?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        })
    }
}
