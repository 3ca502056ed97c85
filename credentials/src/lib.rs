//! # Credentials
//!
//! Resolves named secrets (connection strings, API keys) for the rest of the
//! workspace.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Credential Resolution                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  resolve(name) ──► cache ──► EnvSource ──► PromptSource        │
//! │                                   │             │               │
//! │                                   ▼             ▼               │
//! │                            KeyringSource   export to env        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sources are tried in the configured order. The first value found is
//! cached for the lifetime of the resolver.

pub mod error;
pub mod resolver;
pub mod source;

pub use error::{CredentialError, Result};
pub use resolver::CredentialResolver;
pub use source::{
    CredentialSource, EnvSource, KeyringSource, PromptSource, SourceKind, StaticSource,
};

/// Environment variable holding the MongoDB Atlas connection string.
pub const ATLAS_CONNECTION_STRING: &str = "ATLAS_CONNECTION_STRING";

/// Environment variable holding the Voyage AI API key.
pub const VOYAGE_API_KEY: &str = "VOYAGE_API_KEY";
