//! Vectorizer strategies.
//!
//! - [`HashVectorizer`]: deterministic MD5 placeholder. Never fails,
//!   but carries no semantic signal. Indexes written by earlier hash-based
//!   deployments stay comparable with fresh query vectors.
//! - [`ProviderVectorizer`]: hosted embeddings through a [`Provider`],
//!   rescaled into `[0, 1]` and fitted to the configured dimension.

use async_trait::async_trait;
use ledgerwise_core::error::KnowledgeError;
use ledgerwise_core::knowledge::{fit_dimension, Vector, Vectorizer};
use ledgerwise_core::provider::{EmbeddingRequest, Provider};
use md5::{Digest, Md5};
use std::sync::Arc;

/// Digest bytes scaled to `[0, 1]`, zero-padded to `dimension`.
pub struct HashVectorizer {
    dimension: usize,
}

impl HashVectorizer {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous form, usable outside an async context.
    pub fn hash_vector(&self, text: &str) -> Vector {
        let digest = Md5::digest(text.as_bytes());
        let raw: Vector = digest.iter().map(|b| *b as f32 / 255.0).collect();
        fit_dimension(raw, self.dimension)
    }
}

#[async_trait]
impl Vectorizer for HashVectorizer {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn vectorize(&self, text: &str) -> Result<Vector, KnowledgeError> {
        Ok(self.hash_vector(text))
    }
}

/// Embeddings from the generation provider's embedding endpoint.
pub struct ProviderVectorizer {
    provider: Arc<dyn Provider>,
    model: String,
    dimension: usize,
}

impl ProviderVectorizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dimension,
        }
    }

    /// Map raw embedding components from `[-1, 1]` into `[0, 1]`.
    fn rescale(raw: Vec<f32>, dimension: usize) -> Vector {
        let scaled = raw
            .into_iter()
            .map(|x| if x.is_finite() { ((x + 1.0) / 2.0).clamp(0.0, 1.0) } else { 0.0 })
            .collect();
        fit_dimension(scaled, dimension)
    }
}

#[async_trait]
impl Vectorizer for ProviderVectorizer {
    fn name(&self) -> &str {
        "provider"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn vectorize(&self, text: &str) -> Result<Vector, KnowledgeError> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            inputs: vec![text.to_string()],
        };

        let response = self
            .provider
            .embed(request)
            .await
            .map_err(|source| KnowledgeError::Embedding {
                provider: self.provider.name().to_string(),
                source,
            })?;

        let raw = response.embeddings.into_iter().next().ok_or_else(|| {
            KnowledgeError::Vectorization(format!(
                "Provider '{}' returned no embedding",
                self.provider.name()
            ))
        })?;

        Ok(Self::rescale(raw, self.dimension))
    }
}
