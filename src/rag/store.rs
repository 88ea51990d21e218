//! In-memory vector store with exhaustive cosine ranking.
//!
//! Fragments are kept in insertion order. Every embedding in the store shares
//! one dimension, fixed by the first insert (or up front via
//! [`VectorStore::with_dimension`]). Insertion order only matters as the
//! tie-break between equal scores.

use tracing::{debug, warn};

use super::error::RagError;
use super::fragment::{Fragment, ScoredFragment};
use crate::llm::LlmProvider;
use crate::vector_math::{cosine_similarity, l2_norm};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Top-k / threshold pair for a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub k: usize,
    pub threshold: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_TOP_K,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct VectorStore {
    fragments: Vec<Fragment>,
    dimension: Option<usize>,
    fixed_dimension: bool,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that only accepts `dimension`-length embeddings, even when empty.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            fragments: Vec::new(),
            dimension: Some(dimension),
            fixed_dimension: true,
        }
    }

    /// Appends one fragment. No deduplication by id.
    pub fn add_document(&mut self, fragment: Fragment) -> Result<(), RagError> {
        let dimension = validate_fragment(&fragment, self.dimension)?;
        self.dimension = Some(dimension);
        self.fragments.push(fragment);
        Ok(())
    }

    /// Appends a batch. The whole batch is validated first; on error nothing is added.
    pub fn add_documents(&mut self, fragments: Vec<Fragment>) -> Result<(), RagError> {
        let mut dimension = self.dimension;
        for fragment in &fragments {
            dimension = Some(validate_fragment(fragment, dimension)?);
        }

        self.dimension = dimension;
        self.fragments.extend(fragments);
        Ok(())
    }

    /// Embeds `query` and returns at most `k` fragments scoring at least `threshold`,
    /// best first.
    ///
    /// An empty store answers immediately without calling the provider.
    pub async fn similarity_search(
        &self,
        query: &str,
        provider: &dyn LlmProvider,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<&Fragment>, RagError> {
        if self.fragments.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = provider.embed(query).await.map_err(|err| {
            warn!("Query embedding failed: {}", err);
            RagError::embedding_unavailable("query", err)
        })?;

        let ranked = self.rank(&query_embedding, k, threshold)?;
        Ok(ranked.into_iter().map(|scored| scored.fragment).collect())
    }

    /// Ranks every fragment against an already computed query embedding.
    ///
    /// Scores below `threshold` are dropped, the rest are sorted descending with a
    /// stable sort (equal scores keep insertion order) and cut to `k`.
    pub fn rank(
        &self,
        query_embedding: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredFragment<'_>>, RagError> {
        if let Some(expected) = self.dimension {
            if query_embedding.len() != expected {
                return Err(RagError::DimensionMismatch {
                    fragment_id: "query".to_string(),
                    expected,
                    actual: query_embedding.len(),
                });
            }
        }

        let mut scored: Vec<ScoredFragment<'_>> = self
            .fragments
            .iter()
            .map(|fragment| ScoredFragment {
                fragment,
                score: cosine_similarity(query_embedding, &fragment.embedding),
            })
            .filter(|scored| scored.score >= threshold)
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        debug!(
            "Ranked {} fragments, {} above threshold {:.2} (k = {})",
            self.fragments.len(),
            scored.len(),
            threshold,
            k
        );

        Ok(scored)
    }

    pub fn document_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Embedding dimension established for this store, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Removes every fragment. A dimension set by the first insert is forgotten;
    /// one fixed with [`VectorStore::with_dimension`] is kept.
    pub fn clear(&mut self) {
        self.fragments.clear();
        if !self.fixed_dimension {
            self.dimension = None;
        }
    }
}

/// Checks one fragment against the expected dimension and returns the dimension
/// it establishes.
fn validate_fragment(fragment: &Fragment, expected: Option<usize>) -> Result<usize, RagError> {
    let actual = fragment.embedding.len();
    if actual == 0 {
        return Err(RagError::InvalidInput(format!(
            "fragment {} has an empty embedding",
            fragment.id
        )));
    }

    if let Some(expected) = expected {
        if actual != expected {
            return Err(RagError::DimensionMismatch {
                fragment_id: fragment.id.clone(),
                expected,
                actual,
            });
        }
    }

    if fragment.embedding.iter().any(|v| !v.is_finite()) {
        return Err(RagError::InvalidInput(format!(
            "fragment {} embedding contains NaN or infinite values",
            fragment.id
        )));
    }

    if l2_norm(&fragment.embedding) == 0.0 {
        warn!(
            "Fragment {} has a zero-magnitude embedding and will score 0 against every query",
            fragment.id
        );
    }

    Ok(actual)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::core::errors::ApiError;
    use crate::llm::{ChatMessage, CompletionStream};
    use crate::rag::FragmentMetadata;

    /// Returns a fixed query embedding and counts calls.
    struct FixedEmbedder {
        embedding: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedEmbedder {
        fn new(embedding: Vec<f32>) -> Self {
            Self {
                embedding,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.embedding.clone())
        }

        async fn stream_chat(&self, _messages: Vec<ChatMessage>) -> Result<CompletionStream, ApiError> {
            Err(ApiError::Internal("not used".to_string()))
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl LlmProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
            Err(ApiError::ServiceUnavailable("connection refused".to_string()))
        }

        async fn stream_chat(&self, _messages: Vec<ChatMessage>) -> Result<CompletionStream, ApiError> {
            Err(ApiError::Internal("not used".to_string()))
        }
    }

    fn fragment(id: &str, embedding: Vec<f32>) -> Fragment {
        Fragment::new(
            id,
            format!("content of {}", id),
            embedding,
            FragmentMetadata {
                title: id.to_uppercase(),
                ..Default::default()
            },
        )
    }

    fn ids(results: &[&Fragment]) -> Vec<String> {
        results.iter().map(|f| f.id.clone()).collect()
    }

    #[test]
    fn store_basic_operations() {
        let mut store = VectorStore::new();
        assert_eq!(store.document_count(), 0);
        assert!(store.dimension().is_none());

        store.add_document(fragment("a", vec![1.0, 0.0])).unwrap();
        store
            .add_documents(vec![fragment("b", vec![0.0, 1.0]), fragment("c", vec![1.0, 1.0])])
            .unwrap();
        assert_eq!(store.document_count(), 3);
        assert_eq!(store.dimension(), Some(2));

        store.clear();
        assert!(store.is_empty());
        assert!(store.dimension().is_none());

        store.add_document(fragment("d", vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn duplicate_ids_are_kept() {
        let mut store = VectorStore::new();
        store.add_document(fragment("a", vec![1.0, 0.0])).unwrap();
        store.add_document(fragment("a", vec![1.0, 0.0])).unwrap();
        assert_eq!(store.document_count(), 2);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut store = VectorStore::new();
        store.add_document(fragment("a", vec![1.0, 0.0])).unwrap();

        let err = store
            .add_document(fragment("b", vec![1.0, 0.0, 0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            RagError::DimensionMismatch {
                fragment_id: "b".to_string(),
                expected: 2,
                actual: 3,
            }
        );
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn failing_batch_leaves_store_unchanged() {
        let mut store = VectorStore::new();
        let batch = vec![
            fragment("a", vec![1.0, 0.0]),
            fragment("b", vec![0.0, 1.0]),
            fragment("c", vec![0.0, 1.0, 0.0]),
        ];

        let err = store.add_documents(batch).unwrap_err();
        assert_eq!(err.error_code(), "DIMENSION_MISMATCH");
        assert!(store.is_empty());
        assert!(store.dimension().is_none());
    }

    #[test]
    fn fixed_dimension_survives_clear() {
        let mut store = VectorStore::with_dimension(3);
        assert!(store.add_document(fragment("a", vec![1.0, 0.0])).is_err());

        store.add_document(fragment("b", vec![1.0, 0.0, 0.0])).unwrap();
        store.clear();
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn non_finite_and_empty_embeddings_are_rejected() {
        let mut store = VectorStore::new();
        assert!(store.add_document(fragment("nan", vec![f32::NAN, 1.0])).is_err());
        assert!(store.add_document(fragment("inf", vec![f32::INFINITY, 1.0])).is_err());
        assert!(store.add_document(fragment("empty", vec![])).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn threshold_filters_orthogonal_fragment() {
        let mut store = VectorStore::new();
        store
            .add_documents(vec![fragment("A", vec![1.0, 0.0]), fragment("B", vec![0.0, 1.0])])
            .unwrap();

        let ranked = store.rank(&[1.0, 0.0], 5, 0.5).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].fragment.id, "A");
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut store = VectorStore::new();
        store
            .add_documents(vec![
                fragment("A", vec![1.0, 0.0]),
                fragment("B", vec![1.0, 0.0]),
                fragment("C", vec![2.0, 0.0]),
            ])
            .unwrap();

        let top1 = store.rank(&[1.0, 0.0], 1, 0.0).unwrap();
        assert_eq!(top1[0].fragment.id, "A");

        let all: Vec<&str> = store
            .rank(&[1.0, 0.0], 10, 0.0)
            .unwrap()
            .iter()
            .map(|s| s.fragment.id.as_str())
            .collect();
        assert_eq!(all, vec!["A", "B", "C"]);
    }

    #[test]
    fn results_are_bounded_sorted_and_above_threshold() {
        let mut store = VectorStore::new();
        let embeddings = [
            vec![1.0, 0.1],
            vec![0.2, 1.0],
            vec![0.9, 0.4],
            vec![-1.0, 0.0],
            vec![0.6, 0.6],
            vec![1.0, -0.3],
            vec![0.0, 0.0],
        ];
        for (i, embedding) in embeddings.iter().enumerate() {
            store
                .add_document(fragment(&format!("f{}", i), embedding.clone()))
                .unwrap();
        }

        let query = [0.8, 0.3];
        for k in 0..=8 {
            for threshold in [-1.0, -0.2, 0.0, 0.5, 0.9, 1.0] {
                let ranked = store.rank(&query, k, threshold).unwrap();
                assert!(ranked.len() <= k);
                assert!(ranked.iter().all(|s| s.score >= threshold));
                assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
            }
        }
    }

    #[test]
    fn zero_magnitude_fragment_scores_zero() {
        let mut store = VectorStore::new();
        store.add_document(fragment("zero", vec![0.0, 0.0])).unwrap();

        let ranked = store.rank(&[1.0, 0.0], 5, 0.0).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, 0.0);

        assert!(store.rank(&[1.0, 0.0], 5, 0.01).unwrap().is_empty());
    }

    #[test]
    fn query_dimension_must_match_store() {
        let mut store = VectorStore::new();
        store.add_document(fragment("a", vec![1.0, 0.0])).unwrap();

        let err = store.rank(&[1.0, 0.0, 0.0], 5, 0.0).unwrap_err();
        assert_eq!(err.error_code(), "DIMENSION_MISMATCH");
    }

    #[tokio::test]
    async fn similarity_search_returns_top_match_only() {
        let mut store = VectorStore::new();
        store
            .add_documents(vec![fragment("A", vec![1.0, 0.0]), fragment("B", vec![0.0, 1.0])])
            .unwrap();
        let provider = FixedEmbedder::new(vec![1.0, 0.0]);

        let results = store
            .similarity_search("workers", &provider, 5, 0.5)
            .await
            .unwrap();
        assert_eq!(ids(&results), vec!["A"]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn similarity_search_breaks_ties_by_insertion_order() {
        let mut store = VectorStore::new();
        store
            .add_documents(vec![fragment("A", vec![1.0, 0.0]), fragment("B", vec![1.0, 0.0])])
            .unwrap();
        let provider = FixedEmbedder::new(vec![1.0, 0.0]);

        let results = store
            .similarity_search("workers", &provider, 1, DEFAULT_SIMILARITY_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(ids(&results), vec!["A"]);
    }

    #[tokio::test]
    async fn empty_store_skips_embedding_call() {
        let store = VectorStore::new();
        let provider = FixedEmbedder::new(vec![1.0, 0.0]);

        let results = store
            .similarity_search("anything", &provider, 5, 0.0)
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(provider.calls(), 0);

        let results = store
            .similarity_search("anything", &FailingEmbedder, 5, 0.0)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_embedding_unavailable() {
        let mut store = VectorStore::new();
        store.add_document(fragment("A", vec![1.0, 0.0])).unwrap();

        let err = store
            .similarity_search("workers", &FailingEmbedder, 5, 0.0)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        match err {
            RagError::EmbeddingUnavailable { target, reason } => {
                assert_eq!(target, "query");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn k_zero_returns_nothing() {
        let mut store = VectorStore::new();
        store.add_document(fragment("A", vec![1.0, 0.0])).unwrap();
        let provider = FixedEmbedder::new(vec![1.0, 0.0]);

        let results = store
            .similarity_search("workers", &provider, 0, 0.0)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn default_options_match_documented_defaults() {
        let options = SearchOptions::default();
        assert_eq!(options.k, 5);
        assert!((options.threshold - 0.7).abs() < f32::EPSILON);
    }
}
