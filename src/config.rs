use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_TRANSCRIPTION_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PROGRESS_PATH: &str = "/get_podcast_progress";
pub const DEFAULT_TRANSCRIPT_PATH: &str = "/get_podcast";
pub const DEFAULT_CHAPTER_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CHAPTER_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHAPTER_TIMEOUT_SECS: u64 = 30;

const ENV_TRANSCRIPTION_URL: &str = "EPISODE_SYNC_TRANSCRIPTION_URL";
const ENV_CHAPTER_URL: &str = "EPISODE_SYNC_CHAPTER_URL";
const ENV_CHAPTER_KEY: &str = "OPENAI_API_KEY";
const ENV_CHAPTER_MODEL: &str = "EPISODE_SYNC_CHAPTER_MODEL";
const ENV_STREAM_TIMEOUT: &str = "EPISODE_SYNC_STREAM_TIMEOUT_SECS";
const ENV_CHAPTER_TIMEOUT: &str = "EPISODE_SYNC_CHAPTER_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transcription_base_url: String,
    pub progress_path: String,
    pub transcript_path: String,
    pub chapter_api_url: String,
    pub chapter_api_key: Option<String>,
    pub chapter_model: String,
    pub stream_timeout_secs: u64,
    pub chapter_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transcription_base_url: DEFAULT_TRANSCRIPTION_URL.to_string(),
            progress_path: DEFAULT_PROGRESS_PATH.to_string(),
            transcript_path: DEFAULT_TRANSCRIPT_PATH.to_string(),
            chapter_api_url: DEFAULT_CHAPTER_URL.to_string(),
            chapter_api_key: None,
            chapter_model: DEFAULT_CHAPTER_MODEL.to_string(),
            stream_timeout_secs: DEFAULT_STREAM_TIMEOUT_SECS,
            chapter_timeout_secs: DEFAULT_CHAPTER_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, reading a `.env` file first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(url) = env_value(ENV_TRANSCRIPTION_URL) {
            config.transcription_base_url = url;
        }
        if let Some(url) = env_value(ENV_CHAPTER_URL) {
            config.chapter_api_url = url;
        }
        config.chapter_api_key = env_value(ENV_CHAPTER_KEY);
        if let Some(model) = env_value(ENV_CHAPTER_MODEL) {
            config.chapter_model = model;
        }
        config.stream_timeout_secs =
            parse_secs(env_value(ENV_STREAM_TIMEOUT), DEFAULT_STREAM_TIMEOUT_SECS);
        config.chapter_timeout_secs =
            parse_secs(env_value(ENV_CHAPTER_TIMEOUT), DEFAULT_CHAPTER_TIMEOUT_SECS);

        config.normalize();

        tracing::info!(
            "Engine config loaded: transcription={}, chapter_model={}, chapter_key={}",
            config.transcription_base_url,
            config.chapter_model,
            config.chapter_api_key.is_some()
        );

        config
    }

    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.normalize();
        Ok(config)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    pub fn chapter_timeout(&self) -> Duration {
        Duration::from_secs(self.chapter_timeout_secs)
    }

    fn normalize(&mut self) {
        self.transcription_base_url =
            normalize_url(&self.transcription_base_url, DEFAULT_TRANSCRIPTION_URL);
        self.chapter_api_url = normalize_url(&self.chapter_api_url, DEFAULT_CHAPTER_URL);
        self.progress_path = normalize_path(&self.progress_path, DEFAULT_PROGRESS_PATH);
        self.transcript_path = normalize_path(&self.transcript_path, DEFAULT_TRANSCRIPT_PATH);
        self.chapter_api_key = self
            .chapter_api_key
            .take()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        if self.chapter_model.trim().is_empty() {
            self.chapter_model = DEFAULT_CHAPTER_MODEL.to_string();
        }
        if self.stream_timeout_secs == 0 {
            self.stream_timeout_secs = DEFAULT_STREAM_TIMEOUT_SECS;
        }
        if self.chapter_timeout_secs == 0 {
            self.chapter_timeout_secs = DEFAULT_CHAPTER_TIMEOUT_SECS;
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_secs(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

fn normalize_url(input: &str, default: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_path(input: &str, default: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
