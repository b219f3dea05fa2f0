use reqwest::Client;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::db::models::Song;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const LYRICS_FALLBACK: &str = "Sorry, something went wrong while fetching the lyrics.";
pub const RECOMMEND_FALLBACK: &str =
    "Sorry, something went wrong while looking for recommendations.";
pub const INFO_FALLBACK: &str = "Sorry, something went wrong while fetching song info.";
pub const CHAT_FALLBACK: &str = "Sorry, something went wrong while processing your question.";
pub const ANALYZE_FALLBACK: &str = "Sorry, something went wrong while analyzing the playlist.";
pub const TRANSLATE_FALLBACK: &str =
    "Sorry, something went wrong while translating the lyrics.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Thin wrapper over the Gemini `generateContent` endpoint. Every public
/// method builds one fixed prompt and falls back to a canned reply on any
/// upstream failure instead of surfacing the error.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    pub fn with_api_base(config: &AppConfig, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err_body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, err_body);
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default();

        if text.is_empty() {
            anyhow::bail!("Gemini returned an empty response");
        }
        Ok(text)
    }

    async fn generate_or(&self, prompt: &str, fallback: &str) -> String {
        match self.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Gemini request failed: {}", e);
                fallback.to_string()
            }
        }
    }

    pub async fn lyrics(&self, title: &str, artist: &str) -> String {
        let by = if artist.is_empty() {
            String::new()
        } else {
            format!(" by {artist}")
        };
        let prompt = format!(
            "Provide the full lyrics of the song \"{title}\"{by}.\n\
             Format:\n\
             [Song Title] - [Artist]\n\n\
             [Full lyrics with clearly separated verses, chorus and bridge]\n\n\
             If the song cannot be identified, say the lyrics are not available."
        );
        self.generate_or(&prompt, LYRICS_FALLBACK).await
    }

    pub async fn recommend(&self, genre: &str, mood: &str) -> String {
        let genre_part = if genre.is_empty() {
            String::new()
        } else {
            format!(" in the {genre} genre")
        };
        let mood_part = if mood.is_empty() {
            String::new()
        } else {
            format!(" matching a {mood} mood")
        };
        let prompt = format!(
            "Recommend 5 songs{genre_part}{mood_part}.\n\
             Format the response as a list:\n\
             1. [Song Title] - [Artist] (one-line reason)\n\
             2. ...\n\n\
             Keep the picks varied and well known."
        );
        self.generate_or(&prompt, RECOMMEND_FALLBACK).await
    }

    pub async fn song_info(&self, title: &str, artist: &str) -> String {
        let by = if artist.is_empty() {
            String::new()
        } else {
            format!(" by {artist}")
        };
        let prompt = format!(
            "Give detailed information about the song \"{title}\"{by}:\n\
             - Artist/Band\n\
             - Album\n\
             - Release year\n\
             - Genre\n\
             - Approximate duration\n\
             - Interesting facts\n\
             - Meaning/theme of the song\n\n\
             Keep the response tidy and easy to read."
        );
        self.generate_or(&prompt, INFO_FALLBACK).await
    }

    pub async fn chat(&self, message: &str, context: &str) -> String {
        let context_part = if context.is_empty() {
            String::new()
        } else {
            format!("Context: {context}\n")
        };
        let prompt = format!(
            "You are a friendly and knowledgeable music assistant.\n\
             {context_part}User: {message}\n\n\
             Reply with something informative, friendly and helpful about music."
        );
        self.generate_or(&prompt, CHAT_FALLBACK).await
    }

    pub async fn analyze_playlist(&self, songs: &[Song]) -> String {
        let song_list = songs
            .iter()
            .map(|s| {
                format!(
                    "{} - {}",
                    s.title,
                    s.artist.as_deref().unwrap_or("Unknown Artist")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Analyze the following playlist and give insight:\n\
             {song_list}\n\n\
             Cover:\n\
             - Dominant genre\n\
             - Overall mood\n\
             - Era/decade\n\
             - Character of the playlist\n\
             - 3-5 songs that would fit well as additions"
        );
        self.generate_or(&prompt, ANALYZE_FALLBACK).await
    }

    pub async fn translate_lyrics(&self, lyrics: &str, language: &str) -> String {
        let target = if language.is_empty() { "English" } else { language };
        let prompt = format!(
            "Translate the following song lyrics into {target}, keeping the \
             structure and the emotional nuance of the original:\n\n{lyrics}"
        );
        self.generate_or(&prompt, TRANSLATE_FALLBACK).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            telegram_bot_token: "test-token".to_string(),
            gemini_api_key: "test-key".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            database_url: "sqlite::memory:".to_string(),
            storage_chat_id: -100,
            port: 0,
        }
    }

    // Port 1 is unassigned on loopback, so every request fails fast with a
    // connection error and the client must return the canned fallback.
    #[tokio::test]
    async fn upstream_failure_returns_fallback() {
        let client = GeminiClient::with_api_base(&test_config(), "http://127.0.0.1:1");

        assert_eq!(client.lyrics("Beat It", "Michael Jackson").await, LYRICS_FALLBACK);
        assert_eq!(client.recommend("jazz", "").await, RECOMMEND_FALLBACK);
        assert_eq!(client.song_info("Beat It", "Michael Jackson").await, INFO_FALLBACK);
        assert_eq!(client.chat("who invented jazz?", "").await, CHAT_FALLBACK);
        assert_eq!(client.analyze_playlist(&[]).await, ANALYZE_FALLBACK);
        assert_eq!(client.translate_lyrics("la la la", "French").await, TRANSLATE_FALLBACK);
    }
}
