//! Error taxonomy for retrieval.
//!
//! - `InvalidInput`: rejected before the store is touched (empty query, empty seed text)
//! - `EmbeddingUnavailable`: the embedding service failed or timed out; retryable by the caller
//! - `DimensionMismatch`: an embedding disagrees with the store's dimension; a configuration bug

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RagError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `target` names what was being embedded (`query` or a fragment id).
    #[error("embedding unavailable for {target}: {reason}")]
    EmbeddingUnavailable { target: String, reason: String },

    #[error("dimension mismatch for {fragment_id}: expected {expected}D, got {actual}D")]
    DimensionMismatch {
        fragment_id: String,
        expected: usize,
        actual: usize,
    },
}

impl RagError {
    pub fn embedding_unavailable(target: &str, err: impl std::fmt::Display) -> Self {
        RagError::EmbeddingUnavailable {
            target: target.to_string(),
            reason: err.to_string(),
        }
    }

    /// Stable code attached to retrieval failure logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::InvalidInput(_) => "INVALID_INPUT",
            RagError::EmbeddingUnavailable { .. } => "EMBEDDING_UNAVAILABLE",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RagError::EmbeddingUnavailable { .. })
    }
}
