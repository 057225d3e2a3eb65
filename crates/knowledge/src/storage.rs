//! Persistent index storage backends.
//!
//! - [`FileIndexStorage`]: JSON file, written atomically via a temp file.
//! - [`InMemoryIndexStorage`]: process-local, for tests and ephemeral runs.

use async_trait::async_trait;
use ledgerwise_core::error::KnowledgeError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::index::KnowledgeIndex;

/// Loads and saves a [`KnowledgeIndex`].
#[async_trait]
pub trait IndexStorage: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet. A present but
    /// unreadable index is [`KnowledgeError::Corrupt`].
    async fn load(&self) -> Result<Option<KnowledgeIndex>, KnowledgeError>;

    async fn save(&self, index: &KnowledgeIndex) -> Result<(), KnowledgeError>;
}

/// Stores the index as a pretty-printed JSON object at `path`.
pub struct FileIndexStorage {
    path: PathBuf,
}

impl FileIndexStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl IndexStorage for FileIndexStorage {
    async fn load(&self) -> Result<Option<KnowledgeIndex>, KnowledgeError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(KnowledgeError::Storage(format!(
                    "Failed to read index {}: {e}",
                    self.path.display()
                )));
            }
        };

        let index: KnowledgeIndex = serde_json::from_str(&content).map_err(|e| {
            KnowledgeError::Corrupt(format!("Malformed index {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), terms = index.len(), "Loaded persisted index");
        Ok(Some(index))
    }

    async fn save(&self, index: &KnowledgeIndex) -> Result<(), KnowledgeError> {
        let json = serde_json::to_string_pretty(index)
            .map_err(|e| KnowledgeError::Storage(format!("Failed to serialize index: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                KnowledgeError::Storage(format!("Failed to create index directory: {e}"))
            })?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("Failed to write index: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("Failed to replace index: {e}")))?;

        debug!(path = %self.path.display(), terms = index.len(), "Persisted index");
        Ok(())
    }
}

/// Keeps the index in memory. Counts loads and saves.
#[derive(Default)]
pub struct InMemoryIndexStorage {
    index: Mutex<Option<KnowledgeIndex>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryIndexStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-persisted index.
    pub fn with_index(index: KnowledgeIndex) -> Self {
        Self {
            index: Mutex::new(Some(index)),
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Option<KnowledgeIndex> {
        self.index.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexStorage for InMemoryIndexStorage {
    async fn load(&self) -> Result<Option<KnowledgeIndex>, KnowledgeError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let guard = self
            .index
            .lock()
            .map_err(|e| KnowledgeError::Storage(format!("Lock poisoned: {e}")))?;
        Ok(guard.clone())
    }

    async fn save(&self, index: &KnowledgeIndex) -> Result<(), KnowledgeError> {
        let mut guard = self
            .index
            .lock()
            .map_err(|e| KnowledgeError::Storage(format!("Lock poisoned: {e}")))?;
        *guard = Some(index.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
