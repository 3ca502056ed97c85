//! Cross-encoder reranking.

use async_trait::async_trait;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Request to rerank candidate documents against a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankRequest {
    /// The query the documents are judged against.
    pub query: String,

    /// Candidate documents, in their original order.
    pub documents: Vec<String>,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Keep only the best `top_k` results.
    pub top_k: Option<usize>,
}

impl RerankRequest {
    /// Create a new rerank request.
    pub fn new<I, S>(query: impl Into<String>, documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            documents: documents.into_iter().map(Into::into).collect(),
            model: None,
            top_k: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Truncate to the best `top_k` results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// A single reranked document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    /// Position of the document in the request's `documents`.
    pub index: usize,

    /// The document text.
    pub document: String,

    /// Relevance score in the provider's range.
    pub relevance_score: f64,
}

/// Response from a rerank call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResponse {
    /// Results ordered by descending relevance.
    pub results: Vec<RerankResult>,

    /// Model used.
    pub model: String,

    /// Token usage (if reported).
    pub total_tokens: Option<u64>,
}

/// Trait for reranking providers.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default rerank model.
    fn default_rerank_model(&self) -> &str;

    /// Rerank the request's documents by relevance to its query.
    async fn rerank(&self, request: RerankRequest) -> Result<RerankResponse>;
}

/// Validate provider output against the request and put it in final order.
///
/// Indices must point into `documents`. Missing document text is filled in
/// from the request. Results are sorted by descending score, ties by
/// ascending index, then truncated to `top_k`.
pub fn finalize_results(
    mut results: Vec<RerankResult>,
    documents: &[String],
    top_k: Option<usize>,
) -> Result<Vec<RerankResult>> {
    for result in &mut results {
        let Some(text) = documents.get(result.index) else {
            return Err(EmbeddingError::InvalidResponse(format!(
                "rerank index {} out of range for {} documents",
                result.index,
                documents.len()
            )));
        };
        if result.document.is_empty() {
            result.document.clone_from(text);
        }
    }

    results.sort_by(|a, b| {
        OrderedFloat(b.relevance_score)
            .cmp(&OrderedFloat(a.relevance_score))
            .then(a.index.cmp(&b.index))
    });

    if let Some(k) = top_k {
        results.truncate(k);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(index: usize, score: f64) -> RerankResult {
        RerankResult {
            index,
            document: String::new(),
            relevance_score: score,
        }
    }

    #[test]
    fn test_finalize_orders_and_fills_documents() {
        let documents = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = finalize_results(
            vec![result(0, 0.1), result(2, 0.9), result(1, 0.9)],
            &documents,
            Some(2),
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].document, "b");
        assert_eq!(results[1].index, 2);
    }

    #[test]
    fn test_finalize_rejects_out_of_range_index() {
        let documents = vec!["a".to_string()];
        let err = finalize_results(vec![result(3, 0.5)], &documents, None).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }
}
