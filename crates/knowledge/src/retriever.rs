//! Similarity ranking over the knowledge index.

use ledgerwise_core::error::KnowledgeError;
use ledgerwise_core::knowledge::{RankedTerm, Vectorizer};
use std::cmp::Ordering;

use crate::index::KnowledgeIndex;

/// Default number of terms returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ, either vector is empty, or either has
/// zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank every index entry against `query`, best first, keeping at most `k`.
///
/// The sort is stable, so equal scores keep index insertion order.
pub fn rank(query: &[f32], index: &KnowledgeIndex, k: usize) -> Vec<RankedTerm> {
    let mut ranked: Vec<RankedTerm> = index
        .entries()
        .iter()
        .map(|(term, vector)| RankedTerm {
            term: term.clone(),
            score: cosine_similarity(query, vector),
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}

/// Vectorize `query` and rank the index against it.
pub async fn retrieve(
    vectorizer: &dyn Vectorizer,
    query: &str,
    index: &KnowledgeIndex,
    k: usize,
) -> Result<Vec<RankedTerm>, KnowledgeError> {
    let query_vector = vectorizer.vectorize(query).await?;
    Ok(rank(&query_vector, index, k))
}
