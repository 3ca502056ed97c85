//! Search pipeline implementation.

use std::sync::Arc;

use semsearch_credentials::{ATLAS_CONNECTION_STRING, CredentialResolver, VOYAGE_API_KEY};
use semsearch_embeddings::{
    Embedding, EmbeddingError, EmbeddingProvider, EmbeddingRequest, RerankProvider, RerankRequest,
    RerankResult, VoyageClient,
};
use semsearch_vector_search::{
    AtlasVectorStore, Document, LocalCorpus, SearchResult, VectorSearchQuery, VectorStore,
};
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::retriever::Retriever;

/// Embed, search and optionally rerank.
///
/// The remote ([`SearchPipeline::search_remote`]) and local
/// ([`SearchPipeline::search_local`]) strategies are separate entry points;
/// the pipeline never switches between them on its own.
pub struct SearchPipeline {
    /// Configuration.
    config: RetrievalConfig,

    /// Embedding provider.
    embedder: Arc<dyn EmbeddingProvider>,

    /// Remote vector store, if one was configured.
    store: Option<Arc<dyn VectorStore>>,

    /// Reranker, if reranking is available.
    reranker: Option<Arc<dyn RerankProvider>>,
}

impl SearchPipeline {
    /// Create a new pipeline builder.
    pub fn builder(config: RetrievalConfig) -> SearchPipelineBuilder {
        SearchPipelineBuilder::new(config)
    }

    /// The active configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The embedding provider.
    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    /// Embed a search query with the configured model and dimension.
    pub async fn embed_query(&self, text: &str) -> Result<Embedding> {
        let mut request = EmbeddingRequest::query(text).with_model(&self.config.embedding.model);
        if let Some(dimension) = self.config.embedding.output_dimension {
            request = request.with_output_dimension(dimension);
        }

        let embedding = self.embedder.embed(request).await?.into_single()?;
        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    /// Embed documents and collect them into a local corpus.
    pub async fn embed_corpus(&self, documents: Vec<Document>) -> Result<LocalCorpus> {
        let mut request = EmbeddingRequest::documents(documents.iter().map(|d| d.text.clone()))
            .with_model(&self.config.embedding.model);
        if let Some(dimension) = self.config.embedding.output_dimension {
            request = request.with_output_dimension(dimension);
        }

        let response = self.embedder.embed(request).await?;
        if response.embeddings.len() != documents.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                response.embeddings.len()
            ))
            .into());
        }
        for embedding in &response.embeddings {
            self.check_dimension(embedding)?;
        }

        info!("Embedded local corpus of {} documents", documents.len());
        Ok(LocalCorpus::from_parts(documents, response.embeddings)?)
    }

    /// Search the remote vector store, then rerank if enabled.
    pub async fn search_remote(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query_vector = self.embed_query(query).await?;
        self.search_remote_with(query, &query_vector).await
    }

    /// Like [`SearchPipeline::search_remote`] with an already embedded query.
    ///
    /// `query` is still needed as the rerank query.
    pub async fn search_remote_with(
        &self,
        query: &str,
        query_vector: &[f32],
    ) -> Result<Vec<SearchResult>> {
        let vs = &self.config.vector_search;
        let search = VectorSearchQuery::new(&vs.index, &vs.path)
            .with_num_candidates(vs.num_candidates)
            .with_limit(vs.limit);

        let results = self.store()?.vector_search(query_vector, &search).await?;
        debug!("Remote search returned {} results", results.len());

        self.maybe_rerank(query, results).await
    }

    /// Search a local corpus for the best `k` matches, then rerank if enabled.
    pub async fn search_local(
        &self,
        query: &str,
        corpus: &LocalCorpus,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_vector = self.embed_query(query).await?;
        let results = corpus.search(&query_vector, k)?;
        debug!("Local search returned {} results", results.len());

        self.maybe_rerank(query, results).await
    }

    /// Rerank arbitrary documents against a query.
    pub async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: Option<usize>,
    ) -> Result<Vec<RerankResult>> {
        let reranker = self.reranker.as_ref().ok_or_else(|| {
            RetrievalError::Config("no rerank provider configured".to_string())
        })?;

        let mut request = RerankRequest::new(query, documents.iter().cloned())
            .with_model(&self.config.rerank.model);
        if let Some(k) = top_k {
            request = request.with_top_k(k);
        }

        Ok(reranker.rerank(request).await?.results)
    }

    /// Tokenize texts with the configured model's tokenizer.
    pub async fn tokenize(&self, texts: &[String]) -> Result<Vec<Vec<String>>> {
        Ok(self
            .embedder
            .tokenize(texts, Some(&self.config.embedding.model))
            .await?)
    }

    /// Count tokens with the configured model's tokenizer.
    pub async fn count_tokens(&self, texts: &[String]) -> Result<usize> {
        Ok(self
            .embedder
            .count_tokens(texts, Some(&self.config.embedding.model))
            .await?)
    }

    /// A retriever returning the configured number of documents per query.
    pub fn as_retriever(&self) -> Retriever<'_> {
        Retriever::new(self, self.config.retriever.k)
    }

    pub(crate) fn store(&self) -> Result<&dyn VectorStore> {
        self.store
            .as_deref()
            .ok_or_else(|| RetrievalError::Config("no vector store configured".to_string()))
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        match self.config.embedding.output_dimension {
            Some(expected) if expected != embedding.len() => {
                Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    async fn maybe_rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>> {
        if !self.config.rerank.enabled || results.is_empty() {
            return Ok(results);
        }

        let texts: Vec<String> = results.iter().map(|r| r.document.text.clone()).collect();
        let reranked = self.rerank(query, &texts, self.config.rerank.top_k).await?;

        reranked
            .into_iter()
            .enumerate()
            .map(|(i, r)| -> Result<SearchResult> {
                let original = results.get(r.index).ok_or_else(|| {
                    EmbeddingError::InvalidResponse(format!(
                        "rerank index {} out of range for {} results",
                        r.index,
                        results.len()
                    ))
                })?;
                Ok(SearchResult {
                    document: original.document.clone(),
                    score: r.relevance_score,
                    rank: i + 1,
                    corpus_index: original.corpus_index,
                })
            })
            .collect()
    }
}

/// Builder for the search pipeline.
///
/// Components not supplied explicitly are created from configuration,
/// resolving credentials before any network call is made.
pub struct SearchPipelineBuilder {
    config: RetrievalConfig,
    resolver: Option<CredentialResolver>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    reranker: Option<Arc<dyn RerankProvider>>,
    connect_atlas: bool,
}

impl SearchPipelineBuilder {
    /// Create a new builder.
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            config,
            resolver: None,
            embedder: None,
            store: None,
            reranker: None,
            connect_atlas: false,
        }
    }

    /// Use this resolver instead of one built from configuration.
    pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use this embedding provider.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Use this vector store.
    pub fn with_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this reranker.
    pub fn with_reranker(mut self, reranker: Arc<dyn RerankProvider>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Connect to Atlas when no store is supplied.
    pub fn with_atlas(mut self, enabled: bool) -> Self {
        self.connect_atlas = enabled;
        self
    }

    /// Build the pipeline.
    pub async fn build(self) -> Result<SearchPipeline> {
        self.config.validate()?;

        let config = self.config;
        let resolver = self.resolver.unwrap_or_else(|| {
            CredentialResolver::from_kinds(
                &config.credentials.sources,
                &config.credentials.keyring_service,
            )
            .with_export_to_env(config.credentials.export_to_env)
        });

        let need_voyage =
            self.embedder.is_none() || (self.reranker.is_none() && config.rerank.enabled);
        let need_atlas = self.store.is_none() && self.connect_atlas;

        // Resolve everything up front so a missing secret fails before any I/O.
        let voyage_key = if need_voyage {
            Some(resolver.resolve(VOYAGE_API_KEY)?)
        } else {
            None
        };
        let atlas_uri = if need_atlas {
            Some(resolver.resolve(ATLAS_CONNECTION_STRING)?)
        } else {
            None
        };

        let voyage = voyage_key.map(|key| {
            Arc::new(
                VoyageClient::new(key)
                    .with_base_url(&config.embedding.base_url)
                    .with_tokenizer_base_url(&config.embedding.tokenizer_base_url)
                    .with_timeout(config.embedding.timeout())
                    .with_model(&config.embedding.model)
                    .with_rerank_model(&config.rerank.model),
            )
        });

        let embedder: Arc<dyn EmbeddingProvider> = match (self.embedder, &voyage) {
            (Some(embedder), _) => embedder,
            (None, Some(voyage)) => Arc::clone(voyage) as Arc<dyn EmbeddingProvider>,
            (None, None) => {
                return Err(RetrievalError::Config(
                    "no embedding provider available".to_string(),
                ));
            }
        };

        let reranker: Option<Arc<dyn RerankProvider>> = match (self.reranker, voyage) {
            (Some(reranker), _) => Some(reranker),
            (None, Some(voyage)) => Some(voyage as Arc<dyn RerankProvider>),
            (None, None) => None,
        };

        let store = match (self.store, atlas_uri) {
            (Some(store), _) => Some(store),
            (None, Some(uri)) => {
                let vs = &config.vector_search;
                let atlas = AtlasVectorStore::connect(&uri, &vs.namespace)
                    .await?
                    .with_text_key(&vs.text_key)
                    .with_title_key(&vs.title_key)
                    .with_timeout(vs.timeout());
                Some(Arc::new(atlas) as Arc<dyn VectorStore>)
            }
            (None, None) => None,
        };

        info!(
            "Search pipeline ready (embedder: {}, store: {}, reranker: {})",
            embedder.name(),
            store.as_ref().map_or("none", |s| s.name()),
            reranker.as_ref().map_or("none", |r| r.name()),
        );

        Ok(SearchPipeline {
            config,
            embedder,
            store,
            reranker,
        })
    }
}
