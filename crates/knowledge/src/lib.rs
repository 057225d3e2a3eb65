//! Knowledge retrieval for Ledgerwise.
//!
//! Store → vectorizer → index → retriever, with the published index owned
//! by a [`KnowledgeBase`].

pub mod builder;
pub mod index;
pub mod knowledge_base;
mod ordered;
pub mod retriever;
pub mod storage;
pub mod store;
pub mod vectorizer;

pub use builder::build_index;
pub use index::KnowledgeIndex;
pub use knowledge_base::KnowledgeBase;
pub use retriever::{cosine_similarity, rank, retrieve, DEFAULT_TOP_K};
pub use storage::{FileIndexStorage, InMemoryIndexStorage, IndexStorage};
pub use store::KnowledgeStore;
pub use vectorizer::{HashVectorizer, ProviderVectorizer};
