//! The process-wide knowledge base: store, vectorizer, and the published index.
//!
//! The index is built lazily on first use and published behind an `Arc`.
//! Readers clone the `Arc` and never observe a half-built index; a rebuild
//! builds a complete replacement before swapping it in, and a failed rebuild
//! leaves the previous index in place.

use ledgerwise_config::KnowledgeConfig;
use ledgerwise_core::error::KnowledgeError;
use ledgerwise_core::knowledge::{RankedTerm, Vectorizer};
use ledgerwise_core::provider::Provider;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::builder::build_index;
use crate::index::KnowledgeIndex;
use crate::retriever;
use crate::storage::{FileIndexStorage, IndexStorage};
use crate::store::KnowledgeStore;
use crate::vectorizer::{HashVectorizer, ProviderVectorizer};

pub struct KnowledgeBase {
    store: Arc<KnowledgeStore>,
    vectorizer: Arc<dyn Vectorizer>,
    storage: Arc<dyn IndexStorage>,
    index: RwLock<Option<Arc<KnowledgeIndex>>>,
    /// Serializes builds so concurrent cold requests vectorize once.
    build_lock: Mutex<()>,
    top_k: usize,
}

impl KnowledgeBase {
    pub fn new(
        store: KnowledgeStore,
        vectorizer: Arc<dyn Vectorizer>,
        storage: Arc<dyn IndexStorage>,
        top_k: usize,
    ) -> Self {
        Self {
            store: Arc::new(store),
            vectorizer,
            storage,
            index: RwLock::new(None),
            build_lock: Mutex::new(()),
            top_k,
        }
    }

    /// Load (or seed) the knowledge file and select the vectorizer named in
    /// config. `provider` is required only for the `"provider"` strategy.
    pub fn from_config(
        config: &KnowledgeConfig,
        provider: Option<Arc<dyn Provider>>,
    ) -> Result<Self, KnowledgeError> {
        let store = KnowledgeStore::load_or_seed(&config.knowledge_file)?;

        let vectorizer: Arc<dyn Vectorizer> = match (config.vectorizer.as_str(), provider) {
            ("provider", Some(provider)) => Arc::new(ProviderVectorizer::new(
                provider,
                config.embedding_model.clone(),
                config.dimension,
            )),
            ("provider", None) => {
                return Err(KnowledgeError::Vectorization(
                    "Provider vectorizer selected but no provider is available".into(),
                ));
            }
            _ => Arc::new(HashVectorizer::new(config.dimension)),
        };

        info!(
            terms = store.len(),
            vectorizer = vectorizer.name(),
            index_file = %config.index_file.display(),
            "Knowledge base configured"
        );

        Ok(Self::new(
            store,
            vectorizer,
            Arc::new(FileIndexStorage::new(config.index_file.clone())),
            config.top_k,
        ))
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn vectorizer(&self) -> &dyn Vectorizer {
        self.vectorizer.as_ref()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The published index, if one has been built.
    pub async fn current_index(&self) -> Option<Arc<KnowledgeIndex>> {
        self.index.read().await.clone()
    }

    /// Number of indexed terms, 0 before the first build.
    pub async fn indexed_terms(&self) -> usize {
        self.current_index().await.map(|i| i.len()).unwrap_or(0)
    }

    /// Return the published index, building it (or loading the persisted
    /// one) on first use.
    pub async fn ensure_index(&self) -> Result<Arc<KnowledgeIndex>, KnowledgeError> {
        if let Some(index) = self.current_index().await {
            return Ok(index);
        }

        let _guard = self.build_lock.lock().await;
        if let Some(index) = self.current_index().await {
            return Ok(index);
        }

        debug!("Knowledge index cold, building");
        let index = Arc::new(
            build_index(&self.store, self.vectorizer.as_ref(), self.storage.as_ref(), false)
                .await?,
        );
        *self.index.write().await = Some(index.clone());
        Ok(index)
    }

    /// Recompute every vector and publish the new index.
    pub async fn rebuild(&self) -> Result<Arc<KnowledgeIndex>, KnowledgeError> {
        let _guard = self.build_lock.lock().await;
        let index = Arc::new(
            build_index(&self.store, self.vectorizer.as_ref(), self.storage.as_ref(), true)
                .await?,
        );
        *self.index.write().await = Some(index.clone());
        info!(terms = index.len(), "Knowledge index republished");
        Ok(index)
    }

    /// Retrieve the top `k` terms for `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedTerm>, KnowledgeError> {
        let index = self.ensure_index().await?;
        retriever::retrieve(self.vectorizer.as_ref(), query, &index, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryIndexStorage;
    use async_trait::async_trait;
    use ledgerwise_core::knowledge::{KnowledgeEntry, Vector};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn store() -> KnowledgeStore {
        KnowledgeStore::new(vec![
            KnowledgeEntry::new("budget", "A plan for your money."),
            KnowledgeEntry::new("saving", "Setting money aside."),
            KnowledgeEntry::new("debt", "Money you owe."),
        ])
    }

    /// Hash vectorizer that can be switched into a failing mode.
    struct SwitchableVectorizer {
        inner: HashVectorizer,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl SwitchableVectorizer {
        fn new() -> Self {
            Self {
                inner: HashVectorizer::new(128),
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Vectorizer for SwitchableVectorizer {
        fn name(&self) -> &str {
            "switchable"
        }

        fn dimension(&self) -> usize {
            128
        }

        async fn vectorize(&self, text: &str) -> Result<Vector, KnowledgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(KnowledgeError::Vectorization("service down".into()));
            }
            self.inner.vectorize(text).await
        }
    }

    #[tokio::test]
    async fn index_is_built_lazily() {
        let storage = Arc::new(InMemoryIndexStorage::new());
        let kb = KnowledgeBase::new(store(), Arc::new(HashVectorizer::new(128)), storage.clone(), 3);

        assert!(kb.current_index().await.is_none());
        assert_eq!(kb.indexed_terms().await, 0);

        let ranked = kb.retrieve("how do I save money", 3).await.unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(kb.indexed_terms().await, 3);
        assert_eq!(storage.saves(), 1);
    }

    #[tokio::test]
    async fn concurrent_cold_requests_build_once() {
        let vectorizer = Arc::new(SwitchableVectorizer::new());
        let kb = Arc::new(KnowledgeBase::new(
            store(),
            vectorizer.clone(),
            Arc::new(InMemoryIndexStorage::new()),
            3,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let kb = kb.clone();
                tokio::spawn(async move { kb.ensure_index().await.unwrap().len() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 3);
        }
        assert_eq!(vectorizer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_published_index() {
        let vectorizer = Arc::new(SwitchableVectorizer::new());
        let kb = KnowledgeBase::new(
            store(),
            vectorizer.clone(),
            Arc::new(InMemoryIndexStorage::new()),
            3,
        );
        let before = kb.ensure_index().await.unwrap();

        vectorizer.failing.store(true, Ordering::SeqCst);
        let err = kb.rebuild().await.unwrap_err();
        assert!(matches!(err, KnowledgeError::IndexBuild { .. }));

        let after = kb.current_index().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn rebuild_publishes_a_new_index() {
        let kb = KnowledgeBase::new(
            store(),
            Arc::new(HashVectorizer::new(128)),
            Arc::new(InMemoryIndexStorage::new()),
            3,
        );
        let before = kb.ensure_index().await.unwrap();
        let after = kb.rebuild().await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
    }

    #[tokio::test]
    async fn cold_build_failure_surfaces() {
        let vectorizer = Arc::new(SwitchableVectorizer::new());
        vectorizer.failing.store(true, Ordering::SeqCst);
        let kb = KnowledgeBase::new(store(), vectorizer, Arc::new(InMemoryIndexStorage::new()), 3);

        assert!(kb.retrieve("budget", 3).await.is_err());
        assert!(kb.current_index().await.is_none());
    }

    #[tokio::test]
    async fn from_config_seeds_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = KnowledgeConfig {
            knowledge_file: dir.path().join("financial_knowledge.json"),
            index_file: dir.path().join("embeddings.json"),
            ..KnowledgeConfig::default()
        };

        let kb = KnowledgeBase::from_config(&config, None).unwrap();
        assert_eq!(kb.store().len(), 11);
        assert_eq!(kb.vectorizer().name(), "hash");

        kb.ensure_index().await.unwrap();
        assert!(config.index_file.exists());
    }

    #[test]
    fn provider_vectorizer_requires_a_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config = KnowledgeConfig {
            knowledge_file: dir.path().join("kb.json"),
            index_file: dir.path().join("idx.json"),
            vectorizer: "provider".into(),
            ..KnowledgeConfig::default()
        };
        assert!(KnowledgeBase::from_config(&config, None).is_err());
    }
}
