//! Query-in, documents-out view over the remote store.

use semsearch_vector_search::store::MAX_NUM_CANDIDATES;
use semsearch_vector_search::{SearchResult, VectorSearchQuery};
use tracing::debug;

use crate::engine::SearchPipeline;
use crate::error::Result;

/// Returns the `k` most relevant stored documents for a query.
pub struct Retriever<'a> {
    pipeline: &'a SearchPipeline,
    k: usize,
}

impl<'a> Retriever<'a> {
    /// Create a retriever over `pipeline` returning `k` documents.
    pub fn new(pipeline: &'a SearchPipeline, k: usize) -> Self {
        Self { pipeline, k }
    }

    /// Return `k` documents instead.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Documents returned per query.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The vector search this retriever issues.
    pub fn query(&self) -> VectorSearchQuery {
        let config = self.pipeline.config();
        let num_candidates = self
            .k
            .saturating_mul(config.retriever.candidate_multiplier)
            .max(self.k)
            .min(MAX_NUM_CANDIDATES);

        VectorSearchQuery::new(&config.vector_search.index, &config.vector_search.path)
            .with_num_candidates(num_candidates)
            .with_limit(self.k)
    }

    /// Retrieve documents relevant to `query`.
    pub async fn invoke(&self, query: &str) -> Result<Vec<SearchResult>> {
        let search = self.query();
        let query_vector = self.pipeline.embed_query(query).await?;
        let results = self
            .pipeline
            .store()?
            .vector_search(&query_vector, &search)
            .await?;

        debug!("Retriever returned {} documents for {query:?}", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{EmbeddingConfig, RetrievalConfig};
    use pretty_assertions::assert_eq;
    use semsearch_embeddings::{FakeEmbeddingProvider, FakeRerankProvider};
    use semsearch_vector_search::{Document, FakeVectorStore};

    async fn pipeline(store: Arc<FakeVectorStore>) -> SearchPipeline {
        let config = RetrievalConfig::new().with_embedding(EmbeddingConfig {
            output_dimension: Some(8),
            ..EmbeddingConfig::default()
        });

        SearchPipeline::builder(config)
            .with_embedder(Arc::new(FakeEmbeddingProvider::new(8)))
            .with_reranker(Arc::new(FakeRerankProvider::new()))
            .with_store(store)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_returns_k_documents() {
        let mut store = FakeVectorStore::new();
        for i in 0..12_u32 {
            store = store.with_document(
                Document::new(format!("plot {i}")).with_title(format!("Movie {i}")),
                f64::from(i),
            );
        }
        let store = Arc::new(store);
        let pipeline = pipeline(store.clone()).await;

        let retriever = pipeline.as_retriever();
        assert_eq!(retriever.k(), 5);

        let results = retriever.invoke("space adventure").await.unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].document.title.as_deref(), Some("Movie 11"));

        let queries = store.queries();
        assert_eq!(queries[0].limit, 5);
        assert_eq!(queries[0].num_candidates, 50);
    }

    #[tokio::test]
    async fn test_candidate_pool_is_capped() {
        let pipeline = pipeline(Arc::new(FakeVectorStore::new())).await;

        let query = pipeline.as_retriever().with_k(5_000).query();
        assert_eq!(query.num_candidates, MAX_NUM_CANDIDATES);
        assert_eq!(query.limit, 5_000);
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let pipeline = pipeline(Arc::new(FakeVectorStore::new())).await;
        let results = pipeline.as_retriever().invoke("anything").await.unwrap();
        assert!(results.is_empty());
    }
}
