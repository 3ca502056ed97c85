//! # Embeddings
//!
//! This crate provides the text-model side of semantic search: embedding
//! generation, tokenization, cross-encoder reranking, and local cosine
//! similarity over small in-memory candidate sets.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors with asymmetric
//!   query/document encoding
//! - **Token Introspection**: Tokenize and count tokens with the model's tokenizer
//! - **Reranking**: Reorder candidates by relevance to a query
//! - **Similarity Search**: Deterministic cosine top-k
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► top_k (cosine)            │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  VoyageClient / Fake        RerankProvider ──► RerankResult    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fake;
pub mod provider;
pub mod rerank;
pub mod similarity;
pub mod voyage;

pub use error::{EmbeddingError, Result};
pub use fake::{FakeEmbeddingProvider, FakeRerankProvider};
pub use provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, InputType};
pub use rerank::{RerankProvider, RerankRequest, RerankResponse, RerankResult};
pub use similarity::{Scored, cosine_similarity, top_k};
pub use voyage::VoyageClient;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Output dimension used by the Atlas movie collection (`voyage-3-large`).
pub const DEFAULT_DIMENSION: usize = 2048;
