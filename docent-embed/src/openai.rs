//! OpenAI-compatible embeddings over HTTP

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, convert_to_f16};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding provider backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// Inputs are sent in batches of at most `batch_size`. Transient failures
/// (429, 5xx, timeouts, connection errors) are retried with exponential
/// backoff up to `max_retries` attempts per batch.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    dimension: usize,
    batch_size: usize,
    max_retries: usize,
    retry_backoff: Duration,
    normalize: bool,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Build a provider, reading the API key from `config.api_key_env`.
    pub fn new(config: &EmbedConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EmbedError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::with_api_key(config, &api_key)
    }

    /// Build a provider with an explicit API key.
    pub fn with_api_key(config: &EmbedConfig, api_key: &str) -> Result<Self> {
        config.validate()?;
        if api_key.trim().is_empty() {
            return Err(EmbedError::MissingApiKey {
                var: config.api_key_env.clone(),
            });
        }
        let dimension = config.openai_dimension().ok_or_else(|| {
            EmbedError::invalid_config(format!(
                "dimensions must be set for unknown model {}",
                config.model_name
            ))
        })?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| EmbedError::invalid_config("API key is not a valid header value"))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            model: config.model_name.clone(),
            dimensions: config.dimensions,
            dimension,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            normalize: config.normalize,
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match self.send(&request, inputs.len()).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "Embedding request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        self.max_retries,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send(&self, request: &EmbeddingRequest<'_>, expected: usize) -> Result<Vec<Vec<f32>>> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::malformed(format!("invalid response body: {e}")))?;
        if parsed.data.len() != expected {
            return Err(EmbedError::malformed(format!(
                "service returned {} embeddings for {} inputs",
                parsed.data.len(),
                expected
            )));
        }
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.iter().enumerate().any(|(i, entry)| entry.index != i) {
            return Err(EmbedError::malformed("response indices do not cover the batch"));
        }
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.saturating_sub(1).min(5) as u32;
        self.retry_backoff * (1 << capped)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!(
            "Requesting {} embeddings from {} ({})",
            texts.len(),
            self.endpoint,
            self.model
        );

        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            let raw = self.embed_batch(batch).await?;
            all.extend(convert_to_f16(raw, self.normalize));
        }

        EmbeddingResult::validated(all, texts.len(), Some(self.dimension))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
