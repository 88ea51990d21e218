//! One-time corpus construction.
//!
//! The store is built lazily on first use and shared for the life of the
//! process. Concurrent callers all await the same in-flight build and receive
//! its result, success or failure, so every seed document is embedded at most
//! once per build. A failed build is not cached: the next caller starts over.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::error::RagError;
use super::fragment::{Fragment, SeedDocument};
use super::store::VectorStore;
use crate::llm::LlmProvider;

type SharedBuild = Shared<BoxFuture<'static, Result<Arc<VectorStore>, RagError>>>;

enum Slot {
    Empty,
    Building(SharedBuild),
    Ready(Arc<VectorStore>),
}

pub struct CorpusCache {
    seed: Arc<[SeedDocument]>,
    provider: Arc<dyn LlmProvider>,
    slot: Mutex<Slot>,
}

impl CorpusCache {
    pub fn new(seed: Vec<SeedDocument>, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            seed: seed.into(),
            provider,
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Returns the built store, building it if none is ready.
    ///
    /// Callers arriving while a build is running join it instead of starting
    /// another one.
    pub async fn get_or_init(&self) -> Result<Arc<VectorStore>, RagError> {
        let build = {
            let mut slot = self.lock();
            let in_flight = match &*slot {
                Slot::Ready(store) => return Ok(Arc::clone(store)),
                Slot::Building(build) => Some(build.clone()),
                Slot::Empty => None,
            };
            match in_flight {
                Some(build) => build,
                None => {
                    let build = self.start_build();
                    *slot = Slot::Building(build.clone());
                    build
                }
            }
        };

        let result = build.clone().await;

        // Only the build still published may settle the slot; a reset may have
        // replaced it while this one ran.
        let mut slot = self.lock();
        if matches!(&*slot, Slot::Building(current) if current.ptr_eq(&build)) {
            *slot = match &result {
                Ok(store) => Slot::Ready(Arc::clone(store)),
                Err(_) => Slot::Empty,
            };
        }

        result
    }

    /// The built store, without triggering a build.
    pub fn current(&self) -> Option<Arc<VectorStore>> {
        match &*self.lock() {
            Slot::Ready(store) => Some(Arc::clone(store)),
            _ => None,
        }
    }

    /// Forgets the built store; the next [`CorpusCache::get_or_init`] rebuilds it.
    /// Callers already waiting on a running build still get its result.
    pub fn reset(&self) {
        *self.lock() = Slot::Empty;
        info!("Vector store reset");
    }

    fn start_build(&self) -> SharedBuild {
        let seed = Arc::clone(&self.seed);
        let provider = Arc::clone(&self.provider);
        async move {
            build_store(&seed, provider.as_ref())
                .await
                .map(Arc::new)
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Embeds every seed document in order and loads them into a fresh store.
///
/// Ids are `doc-{index}` by seed position.
pub async fn build_store(
    seed: &[SeedDocument],
    provider: &dyn LlmProvider,
) -> Result<VectorStore, RagError> {
    info!("Initializing vector store with {} seed documents", seed.len());

    let mut fragments = Vec::with_capacity(seed.len());
    for (index, doc) in seed.iter().enumerate() {
        let id = format!("doc-{}", index);
        if doc.content.trim().is_empty() {
            return Err(RagError::InvalidInput(format!(
                "seed document {} ({}) has empty content",
                id, doc.metadata.title
            )));
        }

        debug!("Generating embedding for: {}", doc.metadata.title);
        let embedding = provider.embed(&doc.content).await.map_err(|err| {
            warn!("Embedding failed for {} ({}): {}", id, doc.metadata.title, err);
            RagError::embedding_unavailable(&id, err)
        })?;

        fragments.push(Fragment::new(
            id,
            doc.content.clone(),
            embedding,
            doc.metadata.clone(),
        ));
    }

    let mut store = VectorStore::new();
    store.add_documents(fragments)?;
    info!(
        "Vector store initialized with {} documents",
        store.document_count()
    );

    Ok(store)
}
