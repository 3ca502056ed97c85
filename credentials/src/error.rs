//! Error types for credential resolution.

use thiserror::Error;

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Errors that can occur while resolving a credential.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No configured source produced a value.
    #[error("missing credential {name}: not set and no interactive source available")]
    Missing { name: String },

    /// The console prompt failed.
    #[error("prompt for {name} failed: {message}")]
    Prompt { name: String, message: String },

    /// The keyring backend failed.
    #[error("keyring lookup for {name} failed: {message}")]
    Keyring { name: String, message: String },

    /// Unknown source name in configuration.
    #[error("unknown credential source: {0}")]
    UnknownSource(String),
}

impl CredentialError {
    /// Whether this error means the secret is simply not available.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}
