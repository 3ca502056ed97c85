//! Error types for vector search.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for vector search operations.
pub type Result<T> = std::result::Result<T, VectorSearchError>;

/// Errors that can occur during vector search.
#[derive(Error, Debug)]
pub enum VectorSearchError {
    /// Query parameters rejected before reaching the store.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Store configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection or aggregation failure reported by the driver.
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// A result document did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request exceeded the configured deadline.
    #[error("vector search timed out after {0:?}")]
    Timeout(Duration),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl VectorSearchError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
