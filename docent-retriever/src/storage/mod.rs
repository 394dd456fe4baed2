//! Storage abstraction layer for docent-retriever
//!
//! This module defines the vector store contract used by ingestion and
//! retrieval, separating persistence from the pipelines that drive it.
//!
//! ## Key Components
//!
//! - **VectorStore**: batch insert and top-k similarity search
//! - **SqliteStore**: the SQLite implementation ([`sqlite_store`])
//! - **Data Types**: [`NewRecord`], [`EmbeddingRecord`], [`ScoredContent`]
//!
//! ## Guarantees
//!
//! - Every record in a store has the same embedding dimension
//! - Content and embedding of a record are committed together
//! - A batch insert is all-or-nothing
//! - Records are never updated after insertion

use async_trait::async_trait;
use half::f16;
use serde::Serialize;

pub mod sqlite_store;

/// Database ID for a stored record, assigned at insertion time.
pub type RecordId = i64;

/// Blake3 hash of a record's content (32 bytes).
pub type ContentHash = [u8; 32];

/// A record waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub content: String,
    pub embedding: Vec<f16>,
}

impl NewRecord {
    pub fn new(content: impl Into<String>, embedding: Vec<f16>) -> Self {
        Self {
            content: content.into(),
            embedding,
        }
    }

    /// Hash used for optional content deduplication.
    pub fn content_hash(&self) -> ContentHash {
        *blake3::hash(self.content.as_bytes()).as_bytes()
    }
}

/// A persisted chunk and its embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub id: RecordId,
    pub content: String,
    pub content_hash: ContentHash,
    pub embedding: Vec<f16>,
    pub created_at: Option<chrono::NaiveDateTime>,
}

/// One similarity search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredContent {
    pub id: RecordId,
    pub content: String,
    /// Cosine similarity in [-1, 1]; higher is more relevant
    pub score: f32,
}

/// Errors raised by a [`VectorStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A vector's dimension differs from the store's fixed dimension
    #[error("Dimension mismatch: store holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A record was rejected before any write was attempted
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    /// The batch could not be persisted; nothing from it was written
    #[error("Failed to write records: {source}")]
    Write {
        #[source]
        source: sqlx::Error,
    },

    /// Reading from the database failed
    #[error("Database error: {source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },

    /// Stored metadata could not be interpreted
    #[error("Corrupt store: {message}")]
    Corrupt { message: String },

    /// Preparing the database location failed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Persistent collection of embedding records with similarity search.
///
/// Implementations must be safe to share between concurrent request handlers:
/// each `insert_many` is an independent atomic batch, and searches read a
/// consistent snapshot that may or may not include concurrent inserts.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a batch of records atomically and return their assigned IDs in
    /// input order. An empty batch is a no-op.
    ///
    /// With content deduplication enabled, records whose content already
    /// exists are skipped and do not appear in the returned IDs.
    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<Vec<RecordId>, StoreError>;

    /// Return at most `k` records ordered by descending cosine similarity to
    /// `query`, ties broken by ascending ID.
    async fn search_top_k(&self, query: &[f16], k: usize) -> Result<Vec<ScoredContent>, StoreError>;

    /// Number of stored records
    async fn count(&self) -> Result<usize, StoreError>;

    /// The fixed embedding dimension, or `None` while the store is empty and
    /// no dimension has been established
    async fn dimension(&self) -> Result<Option<usize>, StoreError>;
}
