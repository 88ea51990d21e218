use std::sync::Arc;

use tracing::{info, warn};

use super::corpus::CorpusCache;
use super::error::RagError;
use super::fragment::Fragment;
use super::prompt::PromptTemplate;
use super::store::SearchOptions;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, CompletionStream, LlmProvider};

/// Per-request retrieval pipeline: validate, retrieve, build prompt, stream the answer.
#[derive(Clone)]
pub struct RagService {
    corpus: Arc<CorpusCache>,
    provider: Arc<dyn LlmProvider>,
    options: SearchOptions,
    template: PromptTemplate,
    max_history: usize,
}

impl RagService {
    pub fn new(
        corpus: Arc<CorpusCache>,
        provider: Arc<dyn LlmProvider>,
        options: SearchOptions,
        template: PromptTemplate,
        max_history: usize,
    ) -> Self {
        Self {
            corpus,
            provider,
            options,
            template,
            max_history,
        }
    }

    /// Fragments loaded so far; `0` until the first query has built the corpus.
    pub fn document_count(&self) -> usize {
        self.corpus
            .current()
            .map(|store| store.document_count())
            .unwrap_or(0)
    }

    /// Ranked fragments for `query`, building the corpus on first use.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Fragment>, RagError> {
        validate_query(query)?;
        let results = self.search(query).await.map_err(|err| {
            warn!(
                code = err.error_code(),
                retryable = err.is_retryable(),
                "Retrieval failed: {}",
                err
            );
            err
        })?;

        info!(
            "Found {} relevant chunks for query: \"{}\"",
            results.len(),
            query
        );
        Ok(results)
    }

    async fn search(&self, query: &str) -> Result<Vec<Fragment>, RagError> {
        let store = self.corpus.get_or_init().await?;
        let results = store
            .similarity_search(
                query,
                self.provider.as_ref(),
                self.options.k,
                self.options.threshold,
            )
            .await?;
        Ok(results.into_iter().cloned().collect())
    }

    /// Full chat turn: the system prompt carries the retrieved context, followed by
    /// the capped history and the user's message.
    pub async fn chat(
        &self,
        message: &str,
        history: Vec<ChatMessage>,
    ) -> Result<CompletionStream, ApiError> {
        let fragments = self.retrieve(message).await?;
        let prompt = self.template.render(message, &fragments);
        let messages = assemble_messages(prompt, history, message, self.max_history);
        self.provider.stream_chat(messages).await
    }
}

pub fn validate_query(query: &str) -> Result<(), RagError> {
    if query.trim().is_empty() {
        return Err(RagError::InvalidInput(
            "Message is required and must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

/// `[system prompt, ...last max_history history messages, user message]`.
pub fn assemble_messages(
    prompt: String,
    history: Vec<ChatMessage>,
    message: &str,
    max_history: usize,
) -> Vec<ChatMessage> {
    let skip = history.len().saturating_sub(max_history);
    let mut messages = Vec::with_capacity(history.len() - skip + 2);
    messages.push(ChatMessage::system(prompt));
    messages.extend(history.into_iter().skip(skip));
    messages.push(ChatMessage::user(message));
    messages
}
