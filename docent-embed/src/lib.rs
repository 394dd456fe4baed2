//! # docent-embed
//!
//! Text embedding providers for docent. One async trait, [`EmbeddingProvider`],
//! fronts two implementations:
//!
//! - [`FastEmbedProvider`]: local ONNX models via FastEmbed, no network calls
//!   after the first model download
//! - [`OpenAiProvider`]: any OpenAI-compatible `/embeddings` endpoint
//!
//! Embeddings are returned as half-precision (`f16`) vectors. A batch either
//! comes back complete, one vector per input in input order with a single
//! consistent dimension, or fails with an [`EmbedError`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use docent_embed::{EmbedConfig, create_provider};
//!
//! # async fn example() -> docent_embed::Result<()> {
//! let provider = create_provider(&EmbedConfig::default()).await?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: provider selection and tuning
//! - [`provider`]: the provider trait, result type and the FastEmbed backend
//! - [`openai`]: the HTTP backend
//! - [`error`]: error types and result handling

pub mod config;
pub mod error;
pub mod openai;
pub mod provider;

pub use config::{EmbedConfig, ProviderKind};
pub use error::{EmbedError, Result};
pub use openai::OpenAiProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};

use std::sync::Arc;

/// Build the provider selected by `config`, ready for use.
///
/// FastEmbed models are loaded (and downloaded if needed) before this returns.
pub async fn create_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate()?;
    tracing::info!(
        "Creating {} embedding provider with model {}",
        config.provider,
        config.model_name()
    );
    match config.provider {
        ProviderKind::FastEmbed => Ok(Arc::new(FastEmbedProvider::create(config.clone()).await?)),
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(config)?)),
    }
}
