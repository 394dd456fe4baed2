//! Query-time retrieval: embed a question, search the store, apply the score floor.

use crate::storage::{ScoredContent, StoreError, VectorStore};
use docent_embed::{EmbedError, EmbeddingProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

/// How many results to fetch and how relevant they must be.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPolicy {
    pub top_k: usize,
    pub min_score: f32,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Vector store search failed: {0}")]
    Store(#[from] StoreError),
}

/// Read-only view over a vector store.
///
/// The provider must be the same one used when the store was populated;
/// a provider with a different dimension makes every query fail with
/// [`StoreError::DimensionMismatch`].
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Contents of the at most `k` most similar records scoring at least
    /// `min_score`, most relevant first. An empty result is not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<String>, RetrieveError> {
        Ok(self
            .retrieve_scored(query, k, min_score)
            .await?
            .into_iter()
            .map(|hit| hit.content)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps IDs and scores.
    pub async fn retrieve_scored(
        &self,
        query: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredContent>, RetrieveError> {
        if query.trim().is_empty() {
            return Err(RetrieveError::EmptyQuery);
        }

        let embedding = self.provider.embed_text(query).await?;
        let mut hits = self.store.search_top_k(&embedding, k).await?;
        let candidates = hits.len();
        hits.retain(|hit| hit.score >= min_score);

        tracing::debug!(
            "Retrieved {} of {} candidates above {:.2} for query ({} chars)",
            hits.len(),
            candidates,
            min_score,
            query.chars().count()
        );
        Ok(hits)
    }

    /// Retrieve using a configured policy.
    pub async fn retrieve_with(
        &self,
        query: &str,
        policy: RetrievalPolicy,
    ) -> Result<Vec<String>, RetrieveError> {
        self.retrieve(query, policy.top_k, policy.min_score).await
    }
}
