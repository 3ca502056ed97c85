//! The remote vector store seam.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Document, SearchResult, rank_results};
use crate::error::{Result, VectorSearchError};

/// Atlas caps `numCandidates` at this value.
pub const MAX_NUM_CANDIDATES: usize = 10_000;

/// Parameters of a server-side vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSearchQuery {
    /// Name of the vector index.
    pub index: String,

    /// Field holding the stored embeddings.
    pub path: String,

    /// Candidates the store considers before picking the best `limit`.
    pub num_candidates: usize,

    /// Maximum number of results.
    pub limit: usize,

    /// Optional pre-filter on indexed fields.
    pub filter: Option<serde_json::Value>,
}

impl VectorSearchQuery {
    /// Create a query against `index` over the embedding field `path`.
    pub fn new(index: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            path: path.into(),
            num_candidates: 150,
            limit: 10,
            filter: None,
        }
    }

    /// Set the number of candidates.
    pub fn with_num_candidates(mut self, num_candidates: usize) -> Self {
        self.num_candidates = num_candidates;
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set a pre-filter.
    pub fn with_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Check the query before it is sent anywhere.
    pub fn validate(&self, query_vector: &[f32]) -> Result<()> {
        if query_vector.is_empty() {
            return Err(VectorSearchError::InvalidQuery(
                "query vector is empty".to_string(),
            ));
        }
        if self.index.is_empty() || self.path.is_empty() {
            return Err(VectorSearchError::InvalidQuery(
                "index and path are required".to_string(),
            ));
        }
        if self.limit == 0 {
            return Err(VectorSearchError::InvalidQuery(
                "limit must be positive".to_string(),
            ));
        }
        if self.num_candidates < self.limit {
            return Err(VectorSearchError::InvalidQuery(format!(
                "num_candidates ({}) must be at least limit ({})",
                self.num_candidates, self.limit
            )));
        }
        if self.num_candidates > MAX_NUM_CANDIDATES {
            return Err(VectorSearchError::InvalidQuery(format!(
                "num_candidates ({}) exceeds {MAX_NUM_CANDIDATES}",
                self.num_candidates
            )));
        }
        Ok(())
    }
}

/// A store that answers nearest-neighbour queries itself.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this store.
    fn name(&self) -> &str;

    /// Return at most `query.limit` results, best first.
    async fn vector_search(
        &self,
        query_vector: &[f32],
        query: &VectorSearchQuery,
    ) -> Result<Vec<SearchResult>>;
}

/// A store returning canned scored documents.
///
/// It does not compute similarity; it validates the query like a real
/// store, records it, and returns its documents ranked and truncated.
#[derive(Default)]
pub struct FakeVectorStore {
    documents: Vec<(Document, f64)>,
    dimension: Option<usize>,
    queries: Mutex<Vec<VectorSearchQuery>>,
}

impl FakeVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document with the score the store should report for it.
    pub fn with_document(mut self, document: Document, score: f64) -> Self {
        self.documents.push((document, score));
        self
    }

    /// Reject query vectors of any other dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<VectorSearchQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    fn name(&self) -> &str {
        "fake"
    }

    async fn vector_search(
        &self,
        query_vector: &[f32],
        query: &VectorSearchQuery,
    ) -> Result<Vec<SearchResult>> {
        query.validate(query_vector)?;
        match self.dimension {
            Some(expected) if expected != query_vector.len() => {
                return Err(VectorSearchError::DimensionMismatch {
                    expected,
                    actual: query_vector.len(),
                });
            }
            _ => {}
        }

        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());

        Ok(rank_results(self.documents.clone(), query.limit))
    }
}
