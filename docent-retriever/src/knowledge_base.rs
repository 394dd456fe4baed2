//! Wires configuration into a ready-to-use store, ingestion pipeline and retriever.

use crate::config::DocentConfig;
use crate::retrieval::{IngestionPipeline, Retriever};
use crate::storage::VectorStore;
use crate::storage::sqlite_store::{SqliteStore, StoreStats};
use anyhow::{Context, Result};
use docent_context::Chunker;
use docent_embed::EmbeddingProvider;
use std::sync::Arc;

/// One long-lived store handle shared by the ingestion and retrieval paths.
///
/// Both paths use the same embedding provider, so stored chunks and queries
/// always share a vector space.
#[derive(Clone)]
pub struct KnowledgeBase {
    config: DocentConfig,
    store: Arc<SqliteStore>,
    provider: Arc<dyn EmbeddingProvider>,
    ingestion: IngestionPipeline,
    retriever: Retriever,
}

impl KnowledgeBase {
    /// Open the configured database and embedding provider.
    pub async fn open(config: DocentConfig) -> Result<Self> {
        let provider = docent_embed::create_provider(&config.embedding)
            .await
            .context("Failed to create embedding provider")?;
        Self::with_provider(config, provider).await
    }

    /// Open the configured database with an already constructed provider.
    pub async fn with_provider(
        config: DocentConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(
            SqliteStore::open(&config.database_path, config.store_options())
                .await
                .with_context(|| {
                    format!("Failed to open database {}", config.database_path.display())
                })?,
        );
        Self::assemble(config, store, provider)
    }

    /// Assemble around an existing store (e.g. an in-memory one).
    pub fn assemble(
        config: DocentConfig,
        store: Arc<SqliteStore>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunking.clone())?;
        let shared: Arc<dyn VectorStore> = store.clone();
        let ingestion = IngestionPipeline::new(chunker, provider.clone(), shared.clone())
            .with_timeout(config.ingest_timeout());
        let retriever = Retriever::new(provider.clone(), shared);

        tracing::info!(
            "Knowledge base ready: provider {} (dimension {})",
            provider.provider_name(),
            provider.embedding_dimension()
        );
        Ok(Self {
            config,
            store,
            provider,
            ingestion,
            retriever,
        })
    }

    pub fn config(&self) -> &DocentConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn ingestion(&self) -> &IngestionPipeline {
        &self.ingestion
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats().await?)
    }
}
