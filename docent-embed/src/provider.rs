//! Embedding provider trait and the local FastEmbed implementation

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use fnv::FnvHasher;
use half::f16;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text, in input order
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of f16 embeddings.
    ///
    /// The dimension is inferred from the first embedding vector, or 0 when
    /// the batch is empty. No consistency checks are made; use
    /// [`EmbeddingResult::validated`] for output coming from a model or service.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Build a result after checking it against the request.
    ///
    /// # Errors
    /// [`EmbedError::MalformedResponse`] when the vector count differs from
    /// `expected_len`, when a vector is empty or its length differs from the
    /// others (or from `expected_dim` when given), or when a value is not finite.
    pub fn validated(
        embeddings: Vec<Vec<f16>>,
        expected_len: usize,
        expected_dim: Option<usize>,
    ) -> Result<Self> {
        if embeddings.len() != expected_len {
            return Err(EmbedError::malformed(format!(
                "expected {expected_len} vectors, got {}",
                embeddings.len()
            )));
        }

        let result = Self::new(embeddings);
        if result.is_empty() {
            return Ok(result);
        }
        if result.dimension == 0 {
            return Err(EmbedError::malformed("empty embedding vector"));
        }
        if let Some(expected) = expected_dim {
            if result.dimension != expected {
                return Err(EmbedError::malformed(format!(
                    "expected dimension {expected}, got {}",
                    result.dimension
                )));
            }
        }
        for (i, embedding) in result.embeddings.iter().enumerate() {
            if embedding.len() != result.dimension {
                return Err(EmbedError::malformed(format!(
                    "vector {i} has dimension {}, expected {}",
                    embedding.len(),
                    result.dimension
                )));
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(EmbedError::malformed(format!(
                    "vector {i} contains non-finite values"
                )));
            }
        }
        Ok(result)
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// The same provider must be used for stored chunks and for queries so that
/// both live in one vector space.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text (a one-element batch)
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let result = self.embed_texts(&[text.to_string()]).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::malformed("no embedding generated for text"))
    }

    /// Generate embeddings for multiple texts, preserving order
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Convert f32 embeddings to f16, optionally L2-normalizing each vector.
pub(crate) fn convert_to_f16(embeddings: Vec<Vec<f32>>, normalize: bool) -> Vec<Vec<f16>> {
    embeddings
        .into_iter()
        .map(|embedding| {
            let norm = if normalize {
                embedding.iter().map(|x| x * x).sum::<f32>().sqrt()
            } else {
                0.0
            };
            if norm > 0.0 {
                embedding.into_iter().map(|x| f16::from_f32(x / norm)).collect()
            } else {
                embedding.into_iter().map(f16::from_f32).collect()
            }
        })
        .collect()
}

/// Type alias for cached model entries (model, dimension)
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Global cache for initialized embedding models to avoid reloading
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

fn model_cache() -> MutexGuard<'static, HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Map a configured model name to a fastembed built-in model.
pub fn fastembed_model(name: &str) -> Result<EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "snowflake-arctic-embed-xs" => Ok(EmbeddingModel::SnowflakeArcticEmbedXS),
        other => Err(EmbedError::invalid_config(format!(
            "unsupported fastembed model: {other}"
        ))),
    }
}

/// FastEmbed-based embedding provider using local ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider; call [`initialize`](Self::initialize) before use.
    pub fn new(config: EmbedConfig) -> Self {
        Self {
            config,
            model: None,
            dimension: 0,
        }
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }

    /// Loads the embedding model (downloading it on first use), reusing a cached instance when possible.
    pub async fn initialize(&mut self) -> Result<()> {
        let model_kind = fastembed_model(self.config.model_name())?;
        let cache_key = self.cache_key();

        let cached = model_cache()
            .get(&cache_key)
            .map(|(model, dim)| (Arc::clone(model), *dim));
        if let Some((model, dimension)) = cached {
            tracing::info!("Using cached model for: {}", self.config.model_name());
            self.model = Some(model);
            self.dimension = dimension;
            return Ok(());
        }

        tracing::info!("Loading fastembed model: {}", self.config.model_name());
        let cache_dir = self.config.cache_dir.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let mut options =
                    InitOptions::new(model_kind).with_show_download_progress(false);
                if let Some(dir) = cache_dir {
                    options = options.with_cache_dir(dir);
                }
                let mut model = TextEmbedding::try_new(options)
                    .map_err(|e| EmbedError::ModelInitialization { source: e.into() })?;

                // Probe the output size with a throwaway embedding
                let probe = model
                    .embed(vec!["dimension probe".to_string()], None)
                    .map_err(|e| EmbedError::ModelInitialization { source: e.into() })?;
                let dimension = probe.first().map(|emb| emb.len()).unwrap_or(0);
                if dimension == 0 {
                    return Err(EmbedError::malformed("model produced an empty probe embedding"));
                }
                Ok((model, dimension))
            })
            .await??;

        tracing::info!(
            "Model {} loaded. Dimension: {}",
            self.config.model_name(),
            dimension
        );
        let model = Arc::new(Mutex::new(model));
        model_cache().insert(cache_key, (Arc::clone(&model), dimension));
        self.model = Some(model);
        self.dimension = dimension;
        Ok(())
    }

    /// Clears the global model cache.
    pub fn clear_cache() {
        model_cache().clear();
        tracing::info!("Model cache cleared");
    }

    /// Returns the number of cached models.
    pub fn cache_size() -> usize {
        model_cache().len()
    }

    // Only fields that change the loaded model participate in the key.
    fn cache_key(&self) -> String {
        let mut hasher = FnvHasher::default();
        hasher.write(b"v1:");
        hasher.write(self.config.model_name().to_lowercase().as_bytes());
        if let Some(dir) = &self.config.cache_dir {
            hasher.write(dir.to_string_lossy().as_bytes());
        }
        format!("v1:{:x}", hasher.finish())
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("Model not initialized. Call initialize() first.")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let batch = batch.to_vec();
            let model = Arc::clone(model);
            let raw = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                guard
                    .embed(batch, None)
                    .map_err(|e| EmbedError::EmbeddingGeneration { source: e.into() })
            })
            .await??;
            all_embeddings.extend(convert_to_f16(raw, self.config.normalize));
        }

        EmbeddingResult::validated(all_embeddings, texts.len(), Some(self.dimension))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}
