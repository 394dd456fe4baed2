//! Test doubles for the embedding capability.
#![allow(dead_code)]

use async_trait::async_trait;
use docent_embed::{EmbedError, EmbeddingProvider, EmbeddingResult};
use half::f16;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const ANIMAL_WORDS: &[&str] = &["cat", "mammal", "dog", "pet"];
const FINANCE_WORDS: &[&str] = &["stock", "market", "revenue", "rose"];

/// Deterministic three-axis embedding: animal words, finance words, and a
/// small constant so no vector is zero.
pub struct KeywordProvider;

impl KeywordProvider {
    pub fn vector(text: &str) -> Vec<f16> {
        let lower = text.to_lowercase();
        let axis = |words: &[&str]| {
            if words.iter().any(|w| lower.contains(w)) {
                1.0
            } else {
                0.0
            }
        };
        vec![
            f16::from_f32(axis(ANIMAL_WORDS)),
            f16::from_f32(axis(FINANCE_WORDS)),
            f16::from_f32(0.1),
        ]
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    async fn embed_texts(&self, texts: &[String]) -> docent_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| Self::vector(t)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        3
    }

    fn provider_name(&self) -> &str {
        "keyword"
    }
}

/// Embeds texts one at a time and fails on the `fail_at`-th text (0-based).
pub struct FailingProvider {
    pub fail_at: usize,
    pub embedded: AtomicUsize,
}

impl FailingProvider {
    pub fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            embedded: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    async fn embed_texts(&self, texts: &[String]) -> docent_embed::Result<EmbeddingResult> {
        let mut vectors = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            if i == self.fail_at {
                return Err(EmbedError::Service {
                    status: 503,
                    body: "embedding backend unavailable".to_string(),
                });
            }
            self.embedded.fetch_add(1, Ordering::SeqCst);
            vectors.push(KeywordProvider::vector(text));
        }
        Ok(EmbeddingResult::new(vectors))
    }

    fn embedding_dimension(&self) -> usize {
        3
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

/// Sleeps before answering, for timeout tests.
pub struct SlowProvider {
    pub delay: Duration,
}

#[async_trait]
impl EmbeddingProvider for SlowProvider {
    async fn embed_texts(&self, texts: &[String]) -> docent_embed::Result<EmbeddingResult> {
        tokio::time::sleep(self.delay).await;
        KeywordProvider.embed_texts(texts).await
    }

    fn embedding_dimension(&self) -> usize {
        3
    }

    fn provider_name(&self) -> &str {
        "slow"
    }
}

/// Produces vectors of a fixed dimension.
pub struct WideProvider;

#[async_trait]
impl EmbeddingProvider for WideProvider {
    async fn embed_texts(&self, texts: &[String]) -> docent_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|_| vec![f16::ONE; 5]).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        5
    }

    fn provider_name(&self) -> &str {
        "wide"
    }
}

/// Twenty four-character tokens: ten chunks at size 9 with no overlap.
pub fn ten_chunk_document() -> String {
    (0..20)
        .map(|i| format!("t{i:03}"))
        .collect::<Vec<_>>()
        .join(" ")
}
