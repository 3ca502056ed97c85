//! Configuration for the search pipeline.
//!
//! Every section has defaults matching the Atlas `sample_mflix` movie
//! collection embedded with `voyage-3-large`. A TOML file may override any
//! subset of fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use semsearch_credentials::SourceKind;
use semsearch_vector_search::Namespace;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "SEMSEARCH_CONFIG";

/// Configuration for the search pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Credential source configuration.
    pub credentials: CredentialsConfig,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Remote vector search configuration.
    pub vector_search: VectorSearchConfig,

    /// Reranking configuration.
    pub rerank: RerankConfig,

    /// Retriever configuration.
    pub retriever: RetrieverConfig,
}

impl RetrievalConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `path`, or from `$SEMSEARCH_CONFIG`, or defaults.
    ///
    /// An explicit path must exist; a path from the environment that does
    /// not exist is ignored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from), false),
        };

        let config = match path {
            Some(path) if required || path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_toml_str(&std::fs::read_to_string(&path)?)?
            }
            _ => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let vs = &self.vector_search;
        if vs.limit == 0 {
            return Err(RetrievalError::Config(
                "vector_search.limit must be positive".to_string(),
            ));
        }
        if vs.num_candidates < vs.limit {
            return Err(RetrievalError::Config(format!(
                "vector_search.num_candidates ({}) must be at least limit ({})",
                vs.num_candidates, vs.limit
            )));
        }
        vs.namespace
            .parse::<Namespace>()
            .map_err(|e| RetrievalError::Config(format!("vector_search.namespace: {e}")))?;
        if self.embedding.timeout_secs == 0 || vs.timeout_secs == 0 {
            return Err(RetrievalError::Config(
                "timeouts must be positive".to_string(),
            ));
        }
        if self.embedding.output_dimension == Some(0) {
            return Err(RetrievalError::Config(
                "embedding.output_dimension must be positive".to_string(),
            ));
        }
        if self.retriever.k == 0 || self.retriever.candidate_multiplier == 0 {
            return Err(RetrievalError::Config(
                "retriever.k and retriever.candidate_multiplier must be positive".to_string(),
            ));
        }
        if self.rerank.top_k == Some(0) {
            return Err(RetrievalError::Config(
                "rerank.top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the vector search configuration.
    pub fn with_vector_search(mut self, config: VectorSearchConfig) -> Self {
        self.vector_search = config;
        self
    }

    /// Set the rerank configuration.
    pub fn with_rerank(mut self, config: RerankConfig) -> Self {
        self.rerank = config;
        self
    }

    /// Set the credential sources.
    pub fn with_credential_sources(mut self, sources: Vec<SourceKind>) -> Self {
        self.credentials.sources = sources;
        self
    }
}

/// Where credentials come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Sources, tried in order.
    pub sources: Vec<SourceKind>,

    /// Keyring service name for the `keyring` source.
    pub keyring_service: String,

    /// Write resolved values back into the process environment.
    pub export_to_env: bool,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            sources: vec![SourceKind::Env, SourceKind::Prompt],
            keyring_service: "semsearch".to_string(),
            export_to_env: true,
        }
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API base URL.
    pub base_url: String,

    /// Model used for queries and documents.
    pub model: String,

    /// Requested output dimension; `None` uses the model default.
    pub output_dimension: Option<usize>,

    /// Per-request deadline in seconds.
    pub timeout_secs: u64,

    /// Where model tokenizers are downloaded from.
    pub tokenizer_base_url: String,
}

impl EmbeddingConfig {
    /// Per-request deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: semsearch_embeddings::voyage::DEFAULT_BASE_URL.to_string(),
            model: "voyage-3-large".to_string(),
            output_dimension: Some(semsearch_embeddings::DEFAULT_DIMENSION),
            timeout_secs: 30,
            tokenizer_base_url: semsearch_embeddings::voyage::DEFAULT_TOKENIZER_BASE_URL
                .to_string(),
        }
    }
}

/// Configuration for remote vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchConfig {
    /// `database.collection` holding the documents.
    pub namespace: String,

    /// Vector index name.
    pub index: String,

    /// Field holding stored embeddings.
    pub path: String,

    /// Field holding document text.
    pub text_key: String,

    /// Field holding document titles.
    pub title_key: String,

    /// Candidates considered by the store.
    pub num_candidates: usize,

    /// Maximum number of results.
    pub limit: usize,

    /// Per-aggregation deadline in seconds.
    pub timeout_secs: u64,
}

impl VectorSearchConfig {
    /// Per-aggregation deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self {
            namespace: "sample_mflix.embedded_movies".to_string(),
            index: "vector_index".to_string(),
            path: "plot_embedding_voyage_3_large".to_string(),
            text_key: "plot".to_string(),
            title_key: "title".to_string(),
            num_candidates: 150,
            limit: 10,
            timeout_secs: 30,
        }
    }
}

/// Configuration for reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Rerank search results before returning them.
    pub enabled: bool,

    /// Rerank model.
    pub model: String,

    /// Keep only the best `top_k` after reranking.
    pub top_k: Option<usize>,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "rerank-2.5".to_string(),
            top_k: Some(3),
        }
    }
}

/// Configuration for the retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Documents returned per query.
    pub k: usize,

    /// `num_candidates = k * candidate_multiplier`.
    pub candidate_multiplier: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k: 5,
            candidate_multiplier: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = RetrievalConfig::default();
        config.validate().unwrap();
        assert_eq!(config.vector_search.num_candidates, 150);
        assert_eq!(config.vector_search.limit, 10);
        assert_eq!(config.embedding.output_dimension, Some(2048));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RetrievalConfig::from_toml_str(
            r#"
            [credentials]
            sources = ["env", "vault"]

            [rerank]
            enabled = true

            [vector_search]
            limit = 5
            "#,
        )
        .unwrap();

        assert_eq!(
            config.credentials.sources,
            vec![SourceKind::Env, SourceKind::Keyring]
        );
        assert!(config.rerank.enabled);
        assert_eq!(config.rerank.model, "rerank-2.5");
        assert_eq!(config.vector_search.limit, 5);
        assert_eq!(config.vector_search.index, "vector_index");
    }

    #[test]
    fn test_validate_rejects_small_candidate_pool() {
        let config = RetrievalConfig::new().with_vector_search(VectorSearchConfig {
            num_candidates: 5,
            limit: 10,
            ..VectorSearchConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_incomplete_namespace() {
        for namespace in [".embedded_movies", "sample_mflix.", "sample_mflix"] {
            let config = RetrievalConfig::new().with_vector_search(VectorSearchConfig {
                namespace: namespace.to_string(),
                ..VectorSearchConfig::default()
            });
            let err = config.validate().unwrap_err();
            assert!(matches!(err, RetrievalError::Config(_)), "{namespace}");
        }
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[embedding]\nmodel = \"voyage-3.5\"\noutput_dimension = 1024").unwrap();

        let config = RetrievalConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.embedding.model, "voyage-3.5");
        assert_eq!(config.embedding.output_dimension, Some(1024));
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(RetrievalConfig::load(Some(&missing)).is_err());
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_file() {
        unsafe { std::env::remove_var(CONFIG_ENV_VAR) };
        assert_eq!(RetrievalConfig::load(None).unwrap(), RetrievalConfig::default());
    }
}
