use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::rag::SearchOptions;

/// Typed view of the merged, validated configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub retrieval: RetrievalSettings,
    pub chat: ChatSettings,
    pub corpus: CorpusSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl RetrievalSettings {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            k: self.top_k,
            threshold: self.similarity_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    pub max_history: usize,
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Settings {
    pub fn from_value(config: Value) -> Result<Self, ApiError> {
        serde_json::from_value(config)
            .map_err(|err| ApiError::BadRequest(format!("Invalid config: {}", err)))
    }
}
