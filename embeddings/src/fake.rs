//! Deterministic in-memory providers for tests and offline runs.
//!
//! Unregistered texts are embedded as hashed bag-of-words vectors, so texts
//! sharing words score higher under cosine similarity.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::rerank::{RerankProvider, RerankRequest, RerankResponse, RerankResult, finalize_results};
use crate::Embedding;

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

// FNV-1a, stable across runs and platforms.
fn bucket(word: &str, dimension: usize) -> usize {
    let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    (hash % dimension as u64) as usize
}

/// In-memory embedding provider.
pub struct FakeEmbeddingProvider {
    dimension: usize,
    model: String,
    fixed: HashMap<String, Embedding>,
    rate_limited: bool,
    requests: Mutex<Vec<EmbeddingRequest>>,
}

impl FakeEmbeddingProvider {
    /// Create a provider producing vectors of `dimension` entries.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model: "fake-embedding".to_string(),
            fixed: HashMap::new(),
            rate_limited: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Return `embedding` whenever `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, embedding: Embedding) -> Self {
        self.fixed.insert(text.into(), embedding);
        self
    }

    /// Fail every call with a rate limit error.
    pub fn rate_limited(mut self) -> Self {
        self.rate_limited = true;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<EmbeddingRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn hashed(text: &str, dimension: usize) -> Embedding {
        let mut embedding = vec![0.0; dimension];
        for word in words(text) {
            embedding[bucket(&word, dimension)] += 1.0;
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddingProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if self.rate_limited {
            return Err(EmbeddingError::RateLimited {
                retry_after_secs: 1,
            });
        }

        let dimension = request.output_dimension.unwrap_or(self.dimension).max(1);
        let embeddings = request
            .texts
            .iter()
            .map(|text| {
                self.fixed
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| Self::hashed(text, dimension))
            })
            .collect();

        Ok(EmbeddingResponse {
            embeddings,
            model: request.model.unwrap_or_else(|| self.model.clone()),
            total_tokens: Some(request.texts.iter().map(|t| words(t).count() as u64).sum()),
        })
    }

    async fn tokenize(&self, texts: &[String], _model: Option<&str>) -> Result<Vec<Vec<String>>> {
        Ok(texts.iter().map(|t| words(t).collect()).collect())
    }
}

/// In-memory reranker scoring documents by query-word overlap.
#[derive(Default)]
pub struct FakeRerankProvider {
    calls: Mutex<usize>,
}

impl FakeRerankProvider {
    /// Create a new fake reranker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rerank calls received.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RerankProvider for FakeRerankProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn default_rerank_model(&self) -> &str {
        "fake-rerank"
    }

    async fn rerank(&self, request: RerankRequest) -> Result<RerankResponse> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        let query: HashSet<String> = words(&request.query).collect();
        let results = request
            .documents
            .iter()
            .enumerate()
            .map(|(index, document)| {
                let overlap = words(document).collect::<HashSet<_>>().intersection(&query).count();
                RerankResult {
                    index,
                    document: document.clone(),
                    relevance_score: if query.is_empty() {
                        0.0
                    } else {
                        overlap as f64 / query.len() as f64
                    },
                }
            })
            .collect();

        Ok(RerankResponse {
            results: finalize_results(results, &request.documents, request.top_k)?,
            model: request
                .model
                .unwrap_or_else(|| self.default_rerank_model().to_string()),
            total_tokens: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_one_vector_per_text_in_order() {
        let provider = FakeEmbeddingProvider::new(16).with_vector("pinned", vec![1.0; 16]);
        let texts = ["alpha beta", "pinned", "gamma"];

        let response = provider
            .embed(EmbeddingRequest::documents(texts))
            .await
            .unwrap();

        assert_eq!(response.embeddings.len(), texts.len());
        assert_eq!(response.embeddings[1], vec![1.0; 16]);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = FakeEmbeddingProvider::new(64);
        let response = provider
            .embed(EmbeddingRequest::new([
                "apple conference call",
                "apple conference call schedule",
                "rivers and aquatic habitat",
            ]))
            .await
            .unwrap();

        let e = &response.embeddings;
        let near = cosine_similarity(&e[0], &e[1]).unwrap();
        let far = cosine_similarity(&e[0], &e[2]).unwrap();
        assert!(near > far);
    }

    #[tokio::test]
    async fn test_rerank_overlap() {
        let reranker = FakeRerankProvider::new();
        let response = reranker
            .rerank(
                RerankRequest::new(
                    "apple call",
                    ["nothing here", "apple call today", "apple pie"],
                )
                .with_top_k(2),
            )
            .await
            .unwrap();

        let indices: Vec<usize> = response.results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(reranker.calls(), 1);
    }
}
