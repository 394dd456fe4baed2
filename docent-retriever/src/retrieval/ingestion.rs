//! Document ingestion: chunk, embed, store.
//!
//! A document goes through the pipeline in one pass:
//!
//! ```text
//! raw text → Chunker → EmbeddingProvider (one batch) → VectorStore::insert_many
//! ```
//!
//! The only write is the final `insert_many`, a single transaction, so any
//! failure or timeout before it leaves the store exactly as it was.
//! Ingesting the same document twice stores it twice unless the store was
//! opened with content deduplication.

use crate::storage::{NewRecord, StoreError, VectorStore};
use docent_context::{ChunkError, Chunker};
use docent_embed::{EmbedError, EmbeddingProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_INGEST_TIMEOUT: Duration = Duration::from_secs(120);

const NO_TEXT_ERROR: &str = "No text found in document";
const PROCESSING_ERROR: &str = "Failed to process document";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Document contains no text")]
    EmptyInput,

    #[error("Chunking failed: {0}")]
    Chunking(ChunkError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Embedding count {embeddings} does not match chunk count {chunks}")]
    Misaligned { chunks: usize, embeddings: usize },

    #[error("Storing chunks failed: {0}")]
    Storage(#[from] StoreError),

    #[error("Ingestion timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<ChunkError> for IngestError {
    fn from(err: ChunkError) -> Self {
        match err {
            ChunkError::EmptyInput => IngestError::EmptyInput,
            other => IngestError::Chunking(other),
        }
    }
}

/// Result of one ingestion as reported to the uploading client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestionOutcome {
    fn created(chunk_count: usize) -> Self {
        Self {
            success: true,
            chunk_count: Some(chunk_count),
            message: Some(format!("created {chunk_count} searchable chunks")),
            error: None,
        }
    }

    fn failed(error: &IngestError) -> Self {
        let category = match error {
            IngestError::EmptyInput => NO_TEXT_ERROR,
            _ => PROCESSING_ERROR,
        };
        Self {
            success: false,
            chunk_count: None,
            message: None,
            error: Some(category.to_string()),
        }
    }
}

/// Sole writer to the vector store.
#[derive(Clone)]
pub struct IngestionPipeline {
    chunker: Chunker,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        chunker: Chunker,
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            provider,
            store,
            timeout: DEFAULT_INGEST_TIMEOUT,
        }
    }

    /// Bound chunking and embedding (builder style)
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Chunk, embed and store `raw_text`, returning the number of records written.
    ///
    /// On any error nothing is written. The timeout covers chunking and
    /// embedding only: once the batch reaches the store it runs to completion,
    /// so a reported [`IngestError::TimedOut`] always means nothing was stored.
    pub async fn ingest(&self, raw_text: &str) -> Result<usize, IngestError> {
        let records = match tokio::time::timeout(self.timeout, self.prepare(raw_text)).await {
            Ok(records) => records?,
            Err(_) => return Err(IngestError::TimedOut(self.timeout)),
        };

        let ids = self.store.insert_many(records).await?;
        tracing::info!("Stored {} searchable chunks", ids.len());
        Ok(ids.len())
    }

    /// Ingest and translate the result for the client: internal detail is
    /// logged, only a coarse category is returned.
    pub async fn ingest_document(&self, raw_text: &str) -> IngestionOutcome {
        match self.ingest(raw_text).await {
            Ok(count) => IngestionOutcome::created(count),
            Err(err) => {
                tracing::error!("Document ingestion failed: {}", err);
                IngestionOutcome::failed(&err)
            }
        }
    }

    async fn prepare(&self, raw_text: &str) -> Result<Vec<NewRecord>, IngestError> {
        if raw_text.trim().is_empty() {
            return Err(IngestError::EmptyInput);
        }

        let chunks = self.chunker.chunk(raw_text)?;
        tracing::info!(
            "Split document ({} chars) into {} chunks",
            raw_text.chars().count(),
            chunks.len()
        );

        let texts: Vec<String> = chunks.into_iter().map(|chunk| chunk.content).collect();
        let result = self.provider.embed_texts(&texts).await?;
        if result.len() != texts.len() {
            return Err(IngestError::Misaligned {
                chunks: texts.len(),
                embeddings: result.len(),
            });
        }
        tracing::debug!(
            "Embedded {} chunks with {} (dimension {})",
            texts.len(),
            self.provider.provider_name(),
            result.dimension
        );

        Ok(texts
            .into_iter()
            .zip(result.embeddings)
            .map(|(content, embedding)| NewRecord::new(content, embedding))
            .collect())
    }
}
