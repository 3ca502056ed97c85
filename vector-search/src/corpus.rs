//! In-memory corpus searched with local cosine similarity.

use semsearch_embeddings::{Embedding, EmbeddingError, top_k};
use tracing::debug;

use crate::document::{Document, SearchResult};
use crate::error::{Result, VectorSearchError};

/// A small corpus of documents with their embeddings, kept in insertion order.
///
/// All embeddings share one dimension, fixed by the first entry (or by
/// [`LocalCorpus::with_dimension`]).
#[derive(Debug, Clone, Default)]
pub struct LocalCorpus {
    /// Documents, parallel to `embeddings`.
    documents: Vec<Document>,

    /// Embeddings, parallel to `documents`.
    embeddings: Vec<Embedding>,

    /// Expected dimension of embeddings.
    dimension: Option<usize>,
}

impl LocalCorpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty corpus that only accepts `dimension`-length vectors.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    /// Build a corpus from parallel lists.
    pub fn from_parts(documents: Vec<Document>, embeddings: Vec<Embedding>) -> Result<Self> {
        if documents.len() != embeddings.len() {
            return Err(VectorSearchError::InvalidQuery(format!(
                "{} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut corpus = Self::new();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            corpus.add(document, embedding)?;
        }
        Ok(corpus)
    }

    /// Add a document and its embedding.
    pub fn add(&mut self, document: Document, embedding: Embedding) -> Result<()> {
        let expected = *self.dimension.get_or_insert(embedding.len());
        if embedding.len() != expected {
            return Err(VectorSearchError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }

        self.documents.push(document);
        self.embeddings.push(embedding);
        Ok(())
    }

    /// Get a document by position.
    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    /// All documents, in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Dimension of the stored embeddings, once known.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Get the number of entries in the corpus.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Return the `k` documents most similar to `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let scored = top_k(query, &self.embeddings, k).map_err(|e| match e {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                VectorSearchError::DimensionMismatch {
                    // Report against the corpus, not the query.
                    expected: actual,
                    actual: expected,
                }
            }
            other => VectorSearchError::InvalidQuery(other.to_string()),
        })?;

        debug!("Local search over {} documents kept {}", self.len(), scored.len());

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, s)| SearchResult {
                document: self.documents[s.index].clone(),
                score: s.score,
                rank: i + 1,
                corpus_index: Some(s.index),
            })
            .collect())
    }
}
