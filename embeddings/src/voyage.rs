//! Voyage AI client.
//!
//! One client serves embeddings, reranking and tokenization. Embedding and
//! rerank calls go to the Voyage HTTP API; tokenization downloads the
//! model's public tokenizer once and runs it locally.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, InputType};
use crate::rerank::{RerankProvider, RerankRequest, RerankResponse, RerankResult, finalize_results};

/// Default Voyage API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.voyageai.com/v1";

/// Where model tokenizers are published.
pub const DEFAULT_TOKENIZER_BASE_URL: &str = "https://huggingface.co";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Voyage AI embedding, tokenization and rerank client.
pub struct VoyageClient {
    /// API key.
    api_key: String,

    /// API base URL.
    base_url: String,

    /// Tokenizer host base URL.
    tokenizer_base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Per-request deadline.
    timeout: Duration,

    /// Default embedding model.
    default_model: String,

    /// Default rerank model.
    default_rerank_model: String,

    /// Tokenizers already downloaded, by model.
    tokenizers: RwLock<HashMap<String, Arc<Tokenizer>>>,
}

impl VoyageClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tokenizer_base_url: DEFAULT_TOKENIZER_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
            default_model: "voyage-3.5".to_string(),
            default_rerank_model: "rerank-2.5".to_string(),
            tokenizers: RwLock::new(HashMap::new()),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the tokenizer host base URL.
    pub fn with_tokenizer_base_url(mut self, url: impl Into<String>) -> Self {
        self.tokenizer_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the default rerank model.
    pub fn with_rerank_model(mut self, model: impl Into<String>) -> Self {
        self.default_rerank_model = model.into();
        self
    }

    fn transport_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Timeout(self.timeout)
        } else if err.is_decode() {
            EmbeddingError::InvalidResponse(err.to_string())
        } else {
            EmbeddingError::Http(err)
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<VoyageErrorBody>(&error_text)
                .map(|b| b.detail)
                .unwrap_or(error_text);
            return Err(EmbeddingError::Provider(format!("{status}: {detail}")));
        }

        response.json().await.map_err(|e| self.transport_error(e))
    }

    async fn tokenizer(&self, model: &str) -> Result<Arc<Tokenizer>> {
        if let Some(tokenizer) = self.tokenizers.read().await.get(model) {
            return Ok(Arc::clone(tokenizer));
        }

        let url = format!(
            "{}/voyageai/{model}/resolve/main/tokenizer.json",
            self.tokenizer_base_url
        );
        debug!("Downloading tokenizer for {model} from {url}");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Provider(format!(
                "tokenizer for model {model} unavailable: {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let tokenizer = Arc::new(
            Tokenizer::from_bytes(&bytes).map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?,
        );

        self.tokenizers
            .write()
            .await
            .insert(model.to_string(), Arc::clone(&tokenizer));
        info!("Loaded tokenizer for {model}");

        Ok(tokenizer)
    }
}

#[async_trait]
impl EmbeddingProvider for VoyageClient {
    fn name(&self) -> &str {
        "voyage"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = request
            .model
            .unwrap_or_else(|| self.default_model.clone());

        if request.texts.is_empty() {
            return Ok(EmbeddingResponse {
                embeddings: Vec::new(),
                model,
                total_tokens: None,
            });
        }

        debug!(
            "Generating embeddings for {} texts with model: {model}",
            request.texts.len()
        );

        let body = VoyageEmbedBody {
            input: &request.texts,
            model: &model,
            input_type: request.input_type,
            output_dimension: request.output_dimension,
        };
        let result: VoyageEmbedResponse = self.post("embeddings", &body).await?;

        if result.data.len() != request.texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                request.texts.len(),
                result.data.len()
            )));
        }

        let mut data = result.data;
        data.sort_by_key(|item| item.index);
        if data.iter().enumerate().any(|(i, item)| item.index != i) {
            return Err(EmbeddingError::InvalidResponse(
                "embedding indices do not cover the input".to_string(),
            ));
        }

        let embeddings: Vec<_> = data.into_iter().map(|item| item.embedding).collect();
        info!(
            "Generated {} embeddings with {} dimensions",
            embeddings.len(),
            embeddings.first().map_or(0, Vec::len)
        );

        Ok(EmbeddingResponse {
            embeddings,
            model: result.model,
            total_tokens: result.usage.map(|u| u.total_tokens),
        })
    }

    async fn tokenize(&self, texts: &[String], model: Option<&str>) -> Result<Vec<Vec<String>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = model.unwrap_or(&self.default_model);
        let tokenizer = self.tokenizer(model).await?;

        texts
            .iter()
            .map(|text| {
                tokenizer
                    .encode(text.as_str(), true)
                    .map(|encoding| encoding.get_tokens().to_vec())
                    .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl RerankProvider for VoyageClient {
    fn name(&self) -> &str {
        "voyage"
    }

    fn default_rerank_model(&self) -> &str {
        &self.default_rerank_model
    }

    async fn rerank(&self, request: RerankRequest) -> Result<RerankResponse> {
        let model = request
            .model
            .unwrap_or_else(|| self.default_rerank_model.clone());

        if request.documents.is_empty() {
            return Ok(RerankResponse {
                results: Vec::new(),
                model,
                total_tokens: None,
            });
        }

        debug!(
            "Reranking {} documents with model: {model}",
            request.documents.len()
        );

        let body = VoyageRerankBody {
            query: &request.query,
            documents: &request.documents,
            model: &model,
            top_k: request.top_k,
            return_documents: true,
        };
        let result: VoyageRerankResponse = self.post("rerank", &body).await?;

        let results = result
            .data
            .into_iter()
            .map(|item| RerankResult {
                index: item.index,
                document: item.document.unwrap_or_default(),
                relevance_score: item.relevance_score,
            })
            .collect();
        let results = finalize_results(results, &request.documents, request.top_k)?;

        info!("Reranked {} documents", results.len());

        Ok(RerankResponse {
            results,
            model: result.model,
            total_tokens: result.usage.map(|u| u.total_tokens),
        })
    }
}

#[derive(Debug, Serialize)]
struct VoyageEmbedBody<'a> {
    input: &'a [String],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_type: Option<InputType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimension: Option<usize>,
}

#[derive(Debug, Serialize)]
struct VoyageRerankBody<'a> {
    query: &'a str,
    documents: &'a [String],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<usize>,
    return_documents: bool,
}

/// Voyage API response format.
#[derive(Debug, Deserialize)]
struct VoyageEmbedResponse {
    data: Vec<VoyageEmbeddingData>,
    model: String,
    usage: Option<VoyageUsage>,
}

#[derive(Debug, Deserialize)]
struct VoyageEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct VoyageRerankResponse {
    data: Vec<VoyageRerankData>,
    model: String,
    usage: Option<VoyageUsage>,
}

#[derive(Debug, Deserialize)]
struct VoyageRerankData {
    index: usize,
    relevance_score: f64,
    document: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoyageUsage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct VoyageErrorBody {
    detail: String,
}
