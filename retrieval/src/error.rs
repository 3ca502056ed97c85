//! Error types for the search pipeline.

use semsearch_credentials::CredentialError;
use semsearch_embeddings::EmbeddingError;
use semsearch_vector_search::VectorSearchError;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the search pipeline.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Credential resolution error.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Embedding or rerank error.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector search error.
    #[error("vector search error: {0}")]
    VectorSearch(#[from] VectorSearchError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required secret is absent and cannot be prompted for.
    MissingCredential,
    /// A remote call failed (network, auth, bad request, bad response).
    Provider,
    /// The provider throttled the request.
    RateLimit,
    /// Vectors of different lengths were compared.
    DimensionMismatch,
    /// A call exceeded its deadline.
    Timeout,
    /// Local configuration is invalid.
    Config,
}

impl RetrievalError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Credential(CredentialError::Missing { .. }) => ErrorKind::MissingCredential,
            Self::Credential(CredentialError::UnknownSource(_)) => ErrorKind::Config,
            Self::Credential(_) => ErrorKind::Provider,
            Self::Embedding(EmbeddingError::RateLimited { .. }) => ErrorKind::RateLimit,
            Self::Embedding(EmbeddingError::Timeout(_)) => ErrorKind::Timeout,
            Self::Embedding(EmbeddingError::DimensionMismatch { .. }) => {
                ErrorKind::DimensionMismatch
            }
            Self::Embedding(_) => ErrorKind::Provider,
            Self::VectorSearch(VectorSearchError::Timeout(_)) => ErrorKind::Timeout,
            Self::VectorSearch(VectorSearchError::DimensionMismatch { .. }) => {
                ErrorKind::DimensionMismatch
            }
            Self::VectorSearch(VectorSearchError::Config(_)) => ErrorKind::Config,
            Self::VectorSearch(_) => ErrorKind::Provider,
            Self::Config(_) | Self::ConfigParse(_) | Self::Io(_) => ErrorKind::Config,
        }
    }

    /// Whether the caller may retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimit | ErrorKind::Timeout)
    }
}
