//! Knowledge domain types and the vectorizer strategy trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::KnowledgeError;

/// Dimension of every vector produced by a [`Vectorizer`].
pub const DEFAULT_DIMENSION: usize = 128;

/// A fixed-length numeric representation of a text string.
pub type Vector = Vec<f32>;

/// One term of the knowledge base and its plain-language definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique key, e.g. "compound interest".
    pub term: String,
    /// Human-readable definition.
    pub definition: String,
}

impl KnowledgeEntry {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }

    /// The text that gets vectorized for this entry: `"<term>: <definition>"`.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.term, self.definition)
    }
}

/// A term scored against a query. Produced per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTerm {
    pub term: String,
    pub score: f32,
}

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for a given input and always return
/// exactly [`Vectorizer::dimension`] components, each within `[0, 1]`.
/// External implementations may fail; the built-in hashing strategy never does.
#[async_trait]
pub trait Vectorizer: Send + Sync {
    /// Strategy name for logs (e.g. "hash", "provider").
    fn name(&self) -> &str;

    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Vectorize a single text.
    async fn vectorize(&self, text: &str) -> std::result::Result<Vector, KnowledgeError>;
}

/// Force `raw` to exactly `dimension` components: zero-pad short inputs,
/// truncate long ones.
pub fn fit_dimension(mut raw: Vector, dimension: usize) -> Vector {
    raw.resize(dimension, 0.0);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_text_joins_term_and_definition() {
        let entry = KnowledgeEntry::new("budget", "A plan for your money.");
        assert_eq!(entry.embedding_text(), "budget: A plan for your money.");
    }

    #[test]
    fn fit_dimension_pads_and_truncates() {
        let padded = fit_dimension(vec![0.5; 16], DEFAULT_DIMENSION);
        assert_eq!(padded.len(), 128);
        assert_eq!(padded[15], 0.5);
        assert_eq!(padded[16], 0.0);

        let truncated = fit_dimension(vec![0.25; 300], DEFAULT_DIMENSION);
        assert_eq!(truncated.len(), 128);
        assert!(truncated.iter().all(|v| *v == 0.25));
    }

    #[test]
    fn ranked_term_serialization() {
        let ranked = RankedTerm {
            term: "saving".into(),
            score: 0.5,
        };
        let json = serde_json::to_string(&ranked).unwrap();
        assert!(json.contains("saving"));
    }
}
