//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for every failure of an embedding capability.
///
/// Callers treat any variant as "the embedding service failed": no partial
/// batch is ever returned alongside an error.
///
/// # Error Categories
///
/// - **Configuration Errors**: unknown models, missing API keys, bad settings
/// - **Initialization Errors**: failures while loading a local model
/// - **Service Errors**: HTTP failures and non-success responses
/// - **Malformed Output**: wrong vector count, inconsistent dimensionality
/// - **Runtime Errors**: inference failures, task join errors
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The environment variable holding the API key is unset or empty
    #[error("Missing API key: environment variable {var} is not set")]
    MissingApiKey { var: String },

    /// Error during model initialization
    #[error("Model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The service answered with a non-success status
    #[error("Embedding service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// Transport-level failure talking to the service
    #[error("Embedding service request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The service or model produced output that does not match the request
    #[error("Malformed embedding output: {message}")]
    MalformedResponse { message: String },

    /// IO errors when reading model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a malformed output error with a custom message.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            Self::Http { source } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(
            EmbedError::Service {
                status: 429,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            EmbedError::Service {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !EmbedError::Service {
                status: 400,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!EmbedError::malformed("count").is_transient());
        assert!(!EmbedError::invalid_config("bad").is_transient());
    }

    #[test]
    fn test_messages() {
        let err = EmbedError::MissingApiKey {
            var: "OPENAI_API_KEY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing API key: environment variable OPENAI_API_KEY is not set"
        );
        assert_eq!(
            EmbedError::malformed("expected 2 vectors, got 1").to_string(),
            "Malformed embedding output: expected 2 vectors, got 1"
        );
    }
}
