use std::sync::Arc;

use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

mod ai;
mod bot;
mod config;
mod db;
mod service;
mod storage;
mod util;
mod web;

use ai::gemini::GeminiClient;
use bot::session::SessionStore;
use config::AppConfig;
use db::Database;
use service::MusicService;
use storage::TelegramStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🎶 Starting Music Player Bot...");

    // Load config
    let config = AppConfig::from_env()?;
    tracing::info!("Config loaded. Model: {}", config.gemini_model);

    // Initialize database
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;
    tracing::info!("Database connected and migrations applied.");

    // Create the Telegram bot (also backs the storage adapter)
    let telegram = Bot::new(&config.telegram_bot_token);

    let service = MusicService::new(db);
    let gemini = GeminiClient::new(&config);
    let storage = TelegramStorage::new(
        telegram.clone(),
        config.storage_chat_id,
        &config.telegram_bot_token,
    );

    // Start the web API + mini-app
    let router = web::create_router(web::WebState {
        service: service.clone(),
        gemini: gemini.clone(),
        storage: storage.clone(),
        http: reqwest::Client::new(),
    });
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Web server failed: {}", e);
        }
    });

    // Build shared bot state
    let state = Arc::new(bot::AppState {
        service,
        gemini,
        storage,
        sessions: SessionStore::new(),
    });

    // Build the dispatcher
    let handler = bot::build_handler();

    Dispatcher::builder(telegram, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
