//! Similarity computation for embeddings.
//!
//! Everything here is sequential and accumulates in `f64`, so identical
//! inputs always produce identical scores.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors (or a zero vector)
/// - -1.0 means opposite vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    let dot = dot_product(a, b)?;
    let magnitude_a = magnitude(a);
    let magnitude_b = magnitude(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0))
}

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum())
}

fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
}

/// Normalize an embedding to unit length.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude = magnitude(embedding);
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x = (f64::from(*x) / magnitude) as f32;
        }
    }
}

/// A candidate position with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    /// Position in the candidate list.
    pub index: usize,

    /// Cosine similarity to the query.
    pub score: f64,
}

/// Find the `k` candidates most similar to `query`.
///
/// Results are ordered by descending score; equal scores keep ascending
/// candidate order. `k` larger than the candidate count returns every
/// candidate. Fails without a partial result if any candidate's dimension
/// differs from the query's.
pub fn top_k<C>(query: &[f32], candidates: &[C], k: usize) -> Result<Vec<Scored>>
where
    C: AsRef<[f32]>,
{
    let mut scored = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate.as_ref())?;
        scored.push(Scored { index, score });
    }

    // Ties keep index order.
    scored.sort_by(|a, b| {
        OrderedFloat(b.score)
            .cmp(&OrderedFloat(a.score))
            .then(a.index.cmp(&b.index))
    });
    scored.truncate(k);

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![0.3, -1.7, 2.25, 0.001];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_scores_within_bounds() {
        let query = vec![0.9, -0.2, 0.4];
        let candidates = vec![
            vec![1e-3, 5.0, -2.0],
            vec![-7.0, 0.1, 0.2],
            vec![0.9, -0.2, 0.4],
            vec![100.0, 100.0, 100.0],
        ];
        for s in top_k(&query, &candidates, 10).unwrap() {
            assert!((-1.0..=1.0).contains(&s.score));
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &b).is_err());
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_top_k() {
        let query = vec![1.0, 0.0, 0.0];
        let candidates = vec![
            vec![0.0, 1.0, 0.0], // similarity 0.0
            vec![1.0, 0.0, 0.0], // similarity 1.0
            vec![0.7, 0.7, 0.0], // similarity ~0.7
        ];

        let results = top_k(&query, &candidates, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[1].index, 2);
    }

    #[test]
    fn test_top_k_larger_than_candidates_breaks_ties_by_index() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![0.0, 3.0],
            vec![5.0, 0.0],
        ];

        let results = top_k(&query, &candidates, 99).unwrap();
        let order: Vec<usize> = results.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_top_k_zero() {
        let query = vec![1.0];
        let candidates = vec![vec![1.0]];
        assert!(top_k(&query, &candidates, 0).unwrap().is_empty());
    }

    #[test]
    fn test_top_k_rejects_mismatched_candidate() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        let err = top_k(&query, &candidates, 1).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_top_k_is_reproducible() {
        let query = vec![0.12, 0.5, -0.33];
        let candidates = vec![vec![0.1, 0.2, 0.3], vec![-0.4, 0.5, 0.6], vec![0.7, -0.8, 0.9]];
        let first = top_k(&query, &candidates, 3).unwrap();
        let second = top_k(&query, &candidates, 3).unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.score.to_bits(), b.score.to_bits());
        }
    }
}
