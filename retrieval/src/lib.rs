//! # Retrieval Pipeline
//!
//! This crate wires the workspace together:
//!
//! - **Credentials**: API key and connection string resolution
//! - **Embeddings**: Query and document encoding, reranking
//! - **Vector Search**: Remote Atlas search or a local in-memory corpus
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Search Pipeline                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │  Credential  │  │  Embedding   │  │   Reranker   │          │
//! │  │   Resolver   │  │   Provider   │  │  (optional)  │          │
//! │  └──────────────┘  └──────────────┘  └──────────────┘          │
//! │         │                │                  ▲                   │
//! │         └────────────────┤                  │                   │
//! │                          ▼                  │                   │
//! │          ┌──────────────┐  ┌──────────────┐ │                   │
//! │          │ VectorStore  │  │ LocalCorpus  │─┘                   │
//! │          │   (remote)   │  │   (local)    │                     │
//! │          └──────────────┘  └──────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use semsearch_retrieval::{RetrievalConfig, SearchPipeline};
//!
//! let pipeline = SearchPipeline::builder(RetrievalConfig::default())
//!     .with_atlas(true)
//!     .build()
//!     .await?;
//!
//! let results = pipeline.search_remote("space adventure with aliens").await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod retriever;

pub use config::RetrievalConfig;
pub use engine::{SearchPipeline, SearchPipelineBuilder};
pub use error::{ErrorKind, Result, RetrievalError};
pub use retriever::Retriever;

// Re-export from dependencies for convenience
pub use semsearch_credentials::{CredentialResolver, CredentialSource, SourceKind};
pub use semsearch_embeddings::{
    EmbeddingProvider, InputType, RerankProvider, RerankResult, VoyageClient,
};
pub use semsearch_vector_search::{
    AtlasVectorStore, Document, LocalCorpus, SearchResult, VectorSearchQuery, VectorStore,
};
