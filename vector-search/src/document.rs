//! Documents and ranked results.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Text stored in an external collection, plus its descriptive fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The searchable text.
    pub text: String,

    /// Optional title.
    pub title: Option<String>,

    /// Any other fields returned with the document.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a document from its text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a metadata field.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A document with its relevance score and 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,

    /// Relevance score; never increases as rank grows.
    pub score: f64,

    /// Position in the result list, starting at 1.
    pub rank: usize,

    /// Position of the document in a local corpus; `None` for remote results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_index: Option<usize>,
}

/// Order scored documents by descending score and assign ranks.
///
/// Equal scores keep their incoming order.
pub fn rank_results(mut scored: Vec<(Document, f64)>, limit: usize) -> Vec<SearchResult> {
    scored.sort_by(|a, b| OrderedFloat(b.1).cmp(&OrderedFloat(a.1)));
    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (document, score))| SearchResult {
            document,
            score,
            rank: i + 1,
            corpus_index: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rank_results() {
        let results = rank_results(
            vec![
                (Document::new("low"), 0.2),
                (Document::new("high"), 0.9),
                (Document::new("tie"), 0.2),
            ],
            2,
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.text, "high");
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].document.text, "low");
        assert_eq!(results[1].rank, 2);
    }

    #[test]
    fn test_rank_results_orders_nan_deterministically() {
        let results = rank_results(
            vec![
                (Document::new("nan"), f64::NAN),
                (Document::new("mid"), 0.5),
                (Document::new("high"), 0.9),
                (Document::new("low"), 0.1),
            ],
            4,
        );

        let order: Vec<&str> = results.iter().map(|r| r.document.text.as_str()).collect();
        assert_eq!(order, vec!["nan", "high", "mid", "low"]);
        assert!(results.iter().all(|r| r.corpus_index.is_none()));
    }
}
