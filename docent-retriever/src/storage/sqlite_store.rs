//! SQLite implementation of the vector store
//!
//! Records live in a single append-only table; the embedding dimension is
//! fixed by the first insert and kept in a small metadata table.
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE documents (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     content TEXT NOT NULL,
//!     content_hash BLOB NOT NULL,     -- blake3 of content (32 bytes)
//!     embedding BLOB NOT NULL,        -- f16 vector
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! CREATE TABLE store_meta (
//!     key TEXT PRIMARY KEY,           -- currently only 'dimension'
//!     value TEXT NOT NULL
//! );
//! ```
//!
//! ## SQLite Configuration
//!
//! - **WAL mode**: readers see a snapshot while a batch insert is in flight
//! - **Busy timeout**: concurrent writers queue instead of failing
//! - **Large page size** (64KB): suited to embedding blobs
//!
//! Similarity is computed in memory over every stored vector (exhaustive
//! search), which is exact and adequate for knowledge bases of moderate size.

use super::{
    ContentHash, EmbeddingRecord, NewRecord, RecordId, ScoredContent, StoreError, VectorStore,
};
use crate::retrieval::similarity::cosine_similarity;
use async_trait::async_trait;
use half::f16;
use serde::Serialize;
use sqlx::sqlite::{
    SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DIMENSION_KEY: &str = "dimension";

/// Options fixed for the lifetime of a store handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Skip records whose content is already stored (unique content hash).
    ///
    /// Off by default: re-ingesting a document duplicates its records.
    /// Enabling it on a database that already holds duplicates fails at open.
    pub dedup_by_content: bool,
}

impl StoreOptions {
    pub fn with_dedup(self, dedup_by_content: bool) -> Self {
        Self { dedup_by_content }
    }
}

/// Summary counters for status output.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub record_count: usize,
    pub dimension: Option<usize>,
    pub last_insert_at: Option<chrono::NaiveDateTime>,
}

/// SQLite-backed [`VectorStore`].
///
/// Cloning is cheap and shares the underlying connection pool, so one store
/// can be handed to every request handler.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    options: StoreOptions,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(path: &Path, options: StoreOptions) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(path)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .busy_timeout(Duration::from_secs(5))
                    .create_if_missing(true)
                    .auto_vacuum(SqliteAutoVacuum::Full)
                    .page_size(1 << 16),
            )
            .await?;
        Self::new_with_pool(pool, options, Some(path.to_path_buf())).await
    }

    /// Opens an in-memory store, mostly for tests.
    pub async fn open_memory(options: StoreOptions) -> Result<Self, StoreError> {
        // Every connection to :memory: is a separate database, so pin exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::new_with_pool(pool, options, None).await
    }

    async fn new_with_pool(
        pool: SqlitePool,
        options: StoreOptions,
        path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        Self::create_tables(&pool, options).await?;
        tracing::debug!(
            "Opened vector store at {} (dedup: {})",
            path.as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string()),
            options.dedup_by_content
        );
        Ok(Self {
            pool,
            options,
            path,
        })
    }

    async fn create_tables(pool: &SqlitePool, options: StoreOptions) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                content_hash BLOB NOT NULL,
                embedding BLOB NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Dropped again when dedup is turned off
        let index_sql = if options.dedup_by_content {
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_content_hash ON documents(content_hash)"
        } else {
            "DROP INDEX IF EXISTS idx_documents_content_hash"
        };
        sqlx::query(index_sql).execute(pool).await?;

        Ok(())
    }

    /// Path of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Fetch a single record by ID.
    pub async fn get_record(&self, id: RecordId) -> Result<Option<EmbeddingRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, content, content_hash, embedding, created_at FROM documents WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let hash_bytes: Vec<u8> = row.get("content_hash");
        let content_hash: ContentHash =
            hash_bytes.as_slice().try_into().map_err(|_| StoreError::Corrupt {
                message: format!("record {id} has a {}-byte content hash", hash_bytes.len()),
            })?;
        let embedding_bytes: Vec<u8> = row.get("embedding");

        Ok(Some(EmbeddingRecord {
            id: row.get("id"),
            content: row.get("content"),
            content_hash,
            embedding: decode_embedding(id, &embedding_bytes)?,
            created_at: row.get("created_at"),
        }))
    }

    /// Record count, dimension and time of the most recent insert.
    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let last_insert_at: Option<chrono::NaiveDateTime> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM documents")
                .fetch_one(&self.pool)
                .await?;
        Ok(StoreStats {
            record_count: self.count().await?,
            dimension: self.dimension().await?,
            last_insert_at,
        })
    }

    fn insert_sql(&self) -> &'static str {
        if self.options.dedup_by_content {
            r#"
            INSERT INTO documents (content, content_hash, embedding, created_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(content_hash) DO NOTHING
            RETURNING id
            "#
        } else {
            r#"
            INSERT INTO documents (content, content_hash, embedding, created_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            RETURNING id
            "#
        }
    }
}

/// Check a batch before touching the database; returns its common dimension.
fn batch_dimension(records: &[NewRecord]) -> Result<usize, StoreError> {
    let dimension = records.first().map(|r| r.embedding.len()).unwrap_or(0);
    if dimension == 0 {
        return Err(StoreError::InvalidRecord {
            message: "embedding must not be empty".to_string(),
        });
    }
    for record in records {
        if record.embedding.len() != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                actual: record.embedding.len(),
            });
        }
        if record.content.is_empty() {
            return Err(StoreError::InvalidRecord {
                message: "content must not be empty".to_string(),
            });
        }
        if record.embedding.iter().any(|v| !v.is_finite()) {
            return Err(StoreError::InvalidRecord {
                message: "embedding contains non-finite values".to_string(),
            });
        }
    }
    Ok(dimension)
}

/// Highest score first; NaN ranks below every real score.
fn sort_by_score(scored: &mut [ScoredContent]) {
    let key = |score: f32| if score.is_nan() { f32::NEG_INFINITY } else { score };
    // Stable, so ties keep the incoming order
    scored.sort_by(|a, b| key(b.score).total_cmp(&key(a.score)));
}

fn parse_dimension(value: &str) -> Result<usize, StoreError> {
    value.parse().map_err(|_| StoreError::Corrupt {
        message: format!("stored dimension {value:?} is not a number"),
    })
}

fn decode_embedding(id: RecordId, bytes: &[u8]) -> Result<Vec<f16>, StoreError> {
    if bytes.len() % std::mem::size_of::<f16>() != 0 {
        return Err(StoreError::Corrupt {
            message: format!("record {id} has a truncated embedding"),
        });
    }
    let mut embedding = vec![f16::ZERO; bytes.len() / std::mem::size_of::<f16>()];
    bytemuck::cast_slice_mut::<f16, u8>(&mut embedding).copy_from_slice(bytes);
    Ok(embedding)
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<Vec<RecordId>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let dimension = batch_dimension(&records)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| StoreError::Write { source })?;

        // Writing first takes the write lock up front, so a concurrent batch
        // cannot slip in between the dimension check and the inserts.
        sqlx::query("INSERT INTO store_meta (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO NOTHING")
            .bind(DIMENSION_KEY)
            .bind(dimension.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|source| StoreError::Write { source })?;

        let stored: String = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?1")
            .bind(DIMENSION_KEY)
            .fetch_one(&mut *tx)
            .await
            .map_err(|source| StoreError::Write { source })?;
        let expected = parse_dimension(&stored)?;
        if expected != dimension {
            // Dropping the transaction rolls it back
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: dimension,
            });
        }

        let sql = self.insert_sql();
        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            let id: Option<RecordId> = sqlx::query_scalar(sql)
                .bind(&record.content)
                .bind(&record.content_hash()[..])
                .bind(bytemuck::cast_slice::<f16, u8>(&record.embedding))
                .fetch_optional(&mut *tx)
                .await
                .map_err(|source| StoreError::Write { source })?;
            match id {
                Some(id) => ids.push(id),
                None => tracing::debug!("Skipping duplicate content ({} chars)", record.content.len()),
            }
        }

        tx.commit()
            .await
            .map_err(|source| StoreError::Write { source })?;

        tracing::debug!("Inserted {} of {} records", ids.len(), records.len());
        Ok(ids)
    }

    async fn search_top_k(&self, query: &[f16], k: usize) -> Result<Vec<ScoredContent>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        // One read transaction so the dimension and rows come from the same snapshot
        let mut tx = self.pool.begin().await?;
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?1")
                .bind(DIMENSION_KEY)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(stored) = stored else {
            return Ok(Vec::new());
        };
        let dimension = parse_dimension(&stored)?;
        if query.len() != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let rows = sqlx::query("SELECT id, content, embedding FROM documents ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let id: RecordId = row.get("id");
            let bytes: Vec<u8> = row.get("embedding");
            let embedding = decode_embedding(id, &bytes)?;
            if embedding.len() != dimension {
                return Err(StoreError::Corrupt {
                    message: format!(
                        "record {id} has dimension {}, store dimension is {dimension}",
                        embedding.len()
                    ),
                });
            }
            scored.push(ScoredContent {
                id,
                content: row.get("content"),
                score: cosine_similarity(query, &embedding),
            });
        }

        // Rows arrive in id order, so ties stay in insertion order
        sort_by_score(&mut scored);
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn dimension(&self) -> Result<Option<usize>, StoreError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?1")
                .bind(DIMENSION_KEY)
                .fetch_optional(&self.pool)
                .await?;
        stored.as_deref().map(parse_dimension).transpose()
    }
}
