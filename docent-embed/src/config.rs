//! Configuration for embedding providers

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which embedding capability to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Local ONNX model run through fastembed
    #[default]
    #[serde(rename = "fastembed")]
    FastEmbed,
    /// OpenAI-compatible `/embeddings` HTTP endpoint
    #[serde(rename = "openai")]
    OpenAi,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::FastEmbed => write!(f, "fastembed"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastembed" | "local" => Ok(ProviderKind::FastEmbed),
            "openai" => Ok(ProviderKind::OpenAi),
            _ => Err(format!("Invalid embedding provider: {s}")),
        }
    }
}

/// Configuration for embedding models.
///
/// Fields that only apply to one provider are ignored by the other. Every
/// field has a default so partial TOML tables deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Provider selection
    pub provider: ProviderKind,
    /// Name of the embedding model to use
    pub model_name: String,
    /// Maximum batch size for a single inference call or HTTP request
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    pub normalize: bool,
    /// Directory where fastembed caches downloaded model files
    pub cache_dir: Option<PathBuf>,
    /// Base URL of the OpenAI-compatible API
    pub api_base: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Requested output dimensionality (OpenAI); inferred from the model when unset
    pub dimensions: Option<usize>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per request before giving up
    pub max_retries: usize,
    /// Base delay of the exponential retry backoff, in milliseconds
    pub retry_backoff_ms: u64,
}

pub const DEFAULT_FASTEMBED_MODEL: &str = "all-minilm-l6-v2";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::FastEmbed,
            model_name: DEFAULT_FASTEMBED_MODEL.to_string(),
            batch_size: 32,
            normalize: true,
            cache_dir: None,
            api_base: DEFAULT_OPENAI_BASE.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            dimensions: None,
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl EmbedConfig {
    /// Local fastembed model by name.
    pub fn fastembed(model_name: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::FastEmbed,
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// OpenAI `text-embedding-3-small`.
    pub fn openai() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model_name: DEFAULT_OPENAI_MODEL.to_string(),
            batch_size: 96,
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Set the model cache directory (builder style)
    pub fn with_cache_dir(self, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(cache_dir.into()),
            ..self
        }
    }

    /// Set the API base URL (builder style)
    pub fn with_api_base(self, api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..self
        }
    }

    /// Set the requested dimensionality (builder style)
    pub fn with_dimensions(self, dimensions: usize) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..self
        }
    }

    /// Set the retry policy (builder style)
    pub fn with_retries(self, max_retries: usize, retry_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            retry_backoff_ms,
            ..self
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Output dimensionality for the OpenAI provider: explicit setting first,
    /// then the known size of the model.
    pub fn openai_dimension(&self) -> Option<usize> {
        self.dimensions.or(match self.model_name.as_str() {
            "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
            "text-embedding-3-large" => Some(3072),
            _ => None,
        })
    }

    /// Check settings that would otherwise fail at the first request.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model_name must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        if self.provider == ProviderKind::OpenAi {
            if self.api_base.trim().is_empty() {
                return Err(EmbedError::invalid_config("api_base must not be empty"));
            }
            if self.openai_dimension().is_none() {
                return Err(EmbedError::invalid_config(format!(
                    "dimensions must be set for unknown model {}",
                    self.model_name
                )));
            }
            if self.max_retries == 0 {
                return Err(EmbedError::invalid_config("max_retries must be at least 1"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmbedConfig::default();
        assert_eq!(config.provider, ProviderKind::FastEmbed);
        assert_eq!(config.model_name(), DEFAULT_FASTEMBED_MODEL);
        assert_eq!(config.batch_size, 32);
        assert!(config.normalize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_openai_dimension() {
        let config = EmbedConfig::openai();
        assert_eq!(config.openai_dimension(), Some(1536));
        assert_eq!(config.clone().with_dimensions(256).openai_dimension(), Some(256));

        let custom = EmbedConfig {
            model_name: "my-embedder".to_string(),
            ..EmbedConfig::openai()
        };
        assert_eq!(custom.openai_dimension(), None);
        assert!(custom.validate().is_err());
        assert!(custom.with_dimensions(768).validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = EmbedConfig::fastembed("bge-small-en-v1.5")
            .with_batch_size(64)
            .with_normalize(false)
            .with_cache_dir("/tmp/models");

        assert_eq!(config.model_name, "bge-small-en-v1.5");
        assert_eq!(config.batch_size, 64);
        assert!(!config.normalize);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/models")));
        assert!(config.with_batch_size(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EmbedConfig =
            serde_json::from_str(r#"{"provider": "openai", "timeout_secs": 5}"#).unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.api_key_env, DEFAULT_API_KEY_ENV);
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("fastembed".parse::<ProviderKind>(), Ok(ProviderKind::FastEmbed));
        assert!("cohere".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }
}
