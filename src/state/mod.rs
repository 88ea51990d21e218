use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::rag::{seed, CorpusCache, PromptTemplate, RagService, SeedDocument};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// The vector store itself is not built here: `rag` owns a lazily initialized
/// corpus that the first chat request builds.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub rag: RagService,
}

impl AppState {
    /// Loads configuration, connects the provider and prepares the seed corpus.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths);
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let provider: Arc<dyn LlmProvider> = Arc::new(
            OpenAiCompatProvider::new(&settings.provider)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let seed = seed::resolve_corpus(settings.corpus.path.as_deref())
            .map_err(InitializationError::Corpus)?;
        tracing::info!("Seed corpus has {} documents", seed.len());

        Ok(Arc::new(Self::with_provider(settings, provider, seed)))
    }

    /// Assembles state around an existing provider and seed corpus.
    pub fn with_provider(
        settings: Settings,
        provider: Arc<dyn LlmProvider>,
        seed: Vec<SeedDocument>,
    ) -> Self {
        let corpus = Arc::new(CorpusCache::new(seed, provider.clone()));
        let rag = RagService::new(
            corpus,
            provider,
            settings.retrieval.search_options(),
            PromptTemplate::new(settings.chat.subject.clone()),
            settings.chat.max_history,
        );

        AppState {
            settings: Arc::new(settings),
            rag,
        }
    }
}
