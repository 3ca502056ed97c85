//! Embedding providers.
//!
//! The [`EmbeddingProvider`] trait is the seam between callers and a hosted
//! embedding service. [`crate::VoyageClient`] talks to Voyage AI;
//! [`crate::FakeEmbeddingProvider`] is a deterministic in-memory stand-in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};
use crate::Embedding;

/// How the provider should encode the input.
///
/// Retrieval models encode queries and documents asymmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// A search query.
    Query,
    /// A document to be searched.
    Document,
}

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Texts to embed.
    pub texts: Vec<String>,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Query or document encoding.
    pub input_type: Option<InputType>,

    /// Dimensions for the output (if supported by the model).
    pub output_dimension: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a new embedding request for a batch of texts.
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
            model: None,
            input_type: None,
            output_dimension: None,
        }
    }

    /// A single query text.
    pub fn query(text: impl Into<String>) -> Self {
        Self::new([text.into()]).with_input_type(InputType::Query)
    }

    /// A batch of documents.
    pub fn documents<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts).with_input_type(InputType::Document)
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the input type.
    pub fn with_input_type(mut self, input_type: InputType) -> Self {
        self.input_type = Some(input_type);
        self
    }

    /// Set the output dimension.
    pub fn with_output_dimension(mut self, dimension: usize) -> Self {
        self.output_dimension = Some(dimension);
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// One embedding per input text, in input order.
    pub embeddings: Vec<Embedding>,

    /// Model used to generate the embeddings.
    pub model: String,

    /// Token usage (if reported).
    pub total_tokens: Option<u64>,
}

impl EmbeddingResponse {
    /// Dimension of the returned vectors, if any were returned.
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }

    /// Take the single embedding out of a one-text response.
    pub fn into_single(self) -> Result<Embedding> {
        let count = self.embeddings.len();
        let mut embeddings = self.embeddings.into_iter();
        match (embeddings.next(), count) {
            (Some(embedding), 1) => Ok(embedding),
            _ => Err(EmbeddingError::InvalidResponse(format!(
                "expected exactly one embedding, got {count}"
            ))),
        }
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Generate embeddings, one per input text, preserving order.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Split each text into the model's tokens.
    async fn tokenize(&self, texts: &[String], model: Option<&str>) -> Result<Vec<Vec<String>>>;

    /// Total number of tokens across all texts.
    async fn count_tokens(&self, texts: &[String], model: Option<&str>) -> Result<usize> {
        let tokenized = self.tokenize(texts, model).await?;
        Ok(tokenized.iter().map(Vec::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_embedding_request() {
        let request = EmbeddingRequest::query("Hello world")
            .with_model("voyage-3-large")
            .with_output_dimension(2048);

        assert_eq!(request.texts, vec!["Hello world".to_string()]);
        assert_eq!(request.model, Some("voyage-3-large".to_string()));
        assert_eq!(request.input_type, Some(InputType::Query));
        assert_eq!(request.output_dimension, Some(2048));
    }

    #[test]
    fn test_input_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&InputType::Document).unwrap(),
            "\"document\""
        );
    }

    #[test]
    fn test_into_single_rejects_batches() {
        let response = EmbeddingResponse {
            embeddings: vec![vec![1.0], vec![2.0]],
            model: "m".to_string(),
            total_tokens: None,
        };
        assert!(response.into_single().is_err());
    }
}
