//! Deployment configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! configuration: a local fastembed model, a database under `.docent/`, and
//! the retrieval policy of 3 results scoring at least 0.5.
//!
//! ```toml
//! database_path = ".docent/index.db"
//! ingest_timeout_secs = 120
//! dedup_by_content = false
//!
//! [chunking]
//! max_chunk_size = 250
//! chunk_overlap = 30
//!
//! [retrieval]
//! top_k = 3
//! min_score = 0.5
//!
//! [embedding]
//! provider = "openai"
//! model_name = "text-embedding-3-small"
//! ```

use crate::retrieval::RetrievalPolicy;
use crate::storage::sqlite_store::StoreOptions;
use docent_context::ChunkerConfig;
use docent_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE_PATH: &str = ".docent/index.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocentConfig {
    /// SQLite database file holding the knowledge base
    pub database_path: PathBuf,
    /// Upper bound on one document ingestion, embedding calls included
    pub ingest_timeout_secs: u64,
    /// Skip chunks whose exact content is already stored
    pub dedup_by_content: bool,
    pub chunking: ChunkerConfig,
    pub retrieval: RetrievalPolicy,
    pub embedding: EmbedConfig,
}

impl Default for DocentConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            ingest_timeout_secs: 120,
            dedup_by_content: false,
            chunking: ChunkerConfig::default(),
            retrieval: RetrievalPolicy::default(),
            embedding: EmbedConfig::default(),
        }
    }
}

impl DocentConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.embedding
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if !self.retrieval.min_score.is_finite() {
            return Err(ConfigError::Invalid(
                "retrieval.min_score must be a finite number".to_string(),
            ));
        }
        if self.ingest_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "ingest_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ingest_timeout(&self) -> Duration {
        Duration::from_secs(self.ingest_timeout_secs)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default().with_dedup(self.dedup_by_content)
    }
}
