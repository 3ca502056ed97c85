//! # Vector Search
//!
//! Two explicitly separate search strategies that produce the same
//! [`SearchResult`] type:
//!
//! - **Remote**: [`AtlasVectorStore`] delegates nearest-neighbour search to a
//!   MongoDB Atlas `$vectorSearch` aggregation stage.
//! - **Local**: [`LocalCorpus`] scores a small in-memory corpus with cosine
//!   similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Vector Search                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  VectorStore ──► AtlasVectorStore ──► $vectorSearch pipeline   │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  FakeVectorStore          LocalCorpus ──► top_k (cosine)       │
//! │                                 │                               │
//! │                                 ▼                               │
//! │                           SearchResult                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod atlas;
pub mod corpus;
pub mod document;
pub mod error;
pub mod store;

pub use atlas::{AtlasVectorStore, Namespace};
pub use corpus::LocalCorpus;
pub use document::{Document, SearchResult};
pub use error::{Result, VectorSearchError};
pub use store::{FakeVectorStore, VectorSearchQuery, VectorStore};
