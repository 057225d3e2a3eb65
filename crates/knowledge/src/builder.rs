//! Knowledge index builder.
//!
//! Reuses a persisted index when one exists, otherwise vectorizes every
//! store entry concurrently and persists the result. A persisted index is
//! NOT checked against the current store contents: editing the knowledge
//! file without forcing a rebuild serves the old vectors.

use futures::future::try_join_all;
use ledgerwise_core::error::KnowledgeError;
use ledgerwise_core::knowledge::Vectorizer;
use tracing::{debug, info, warn};

use crate::index::KnowledgeIndex;
use crate::storage::IndexStorage;
use crate::store::KnowledgeStore;

/// Build (or load) the index for `store`.
///
/// Any single vectorization failure aborts the build and nothing is saved.
/// A corrupt persisted index, or one whose vectors do not match the
/// vectorizer's dimension, is treated as absent.
pub async fn build_index(
    store: &KnowledgeStore,
    vectorizer: &dyn Vectorizer,
    storage: &dyn IndexStorage,
    force_refresh: bool,
) -> Result<KnowledgeIndex, KnowledgeError> {
    if !force_refresh {
        match storage.load().await {
            Ok(Some(index)) => match index.validate(vectorizer.dimension()) {
                Ok(()) => {
                    info!(terms = index.len(), "Reusing persisted knowledge index");
                    return Ok(index);
                }
                Err(e) => warn!(error = %e, "Persisted index unusable, rebuilding"),
            },
            Ok(None) => debug!("No persisted index, building"),
            Err(KnowledgeError::Corrupt(reason)) => {
                warn!(%reason, "Persisted index is corrupt, rebuilding");
            }
            Err(e) => return Err(e),
        }
    }

    let dimension = vectorizer.dimension();
    let tasks = store.entries().iter().map(|entry| async move {
        let vector = vectorizer
            .vectorize(&entry.embedding_text())
            .await
            .map_err(|e| KnowledgeError::IndexBuild {
                term: entry.term.clone(),
                source: Box::new(e),
            })?;

        if vector.len() != dimension {
            return Err(KnowledgeError::IndexBuild {
                term: entry.term.clone(),
                source: Box::new(KnowledgeError::Vectorization(format!(
                    "got {} components, expected {dimension}",
                    vector.len()
                ))),
            });
        }
        Ok::<_, KnowledgeError>((entry.term.clone(), vector))
    });

    let index = KnowledgeIndex::new(try_join_all(tasks).await?);
    storage.save(&index).await?;

    info!(
        terms = index.len(),
        vectorizer = vectorizer.name(),
        forced = force_refresh,
        "Knowledge index built"
    );
    Ok(index)
}
