use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::ChatMessage;
use crate::core::errors::ApiError;

/// Incremental completion output. Finite and consumed once; the producer stops
/// when the receiver is dropped.
pub type CompletionStream = mpsc::Receiver<Result<String, ApiError>>;

/// Capability handle for the external model service.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// embed a single text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;

    /// chat completion (streaming)
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<CompletionStream, ApiError>;
}
