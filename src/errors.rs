//! Error types for concept-rag
//!
//! Integrity violations are not errors: the validator returns them as data.
//! Everything here is a failure the caller has to react to.

use thiserror::Error;

/// Main error type for the document subsystem
#[derive(Error, Debug)]
pub enum RagError {
    /// A single source tier (filesystem, HTTP, vector service) produced nothing
    #[error("{tier} source unavailable: {reason}")]
    SourceUnavailable { tier: String, reason: String },

    /// Every tier allowed by the deployment mode failed
    #[error("All sources exhausted while loading {artifact}: {details}")]
    SourcesExhausted { artifact: String, details: String },

    /// Manifest text could not be parsed
    #[error("Manifest parse error: {0}")]
    ManifestParse(String),

    /// Embedding provider failure
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// External ANN service failure
    #[error("Vector service error: {0}")]
    VectorService(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic errors with context
    #[error("RAG error: {0}")]
    Generic(String),
}

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub fn unavailable(tier: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RagError::SourceUnavailable {
            tier: tier.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a reqwest failure, keeping timeouts distinguishable
    pub fn from_http(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            RagError::Timeout {
                duration_ms: timeout_ms,
            }
        } else {
            RagError::HttpError(err)
        }
    }
}

/// Convert anyhow errors to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}
