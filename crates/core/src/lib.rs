//! # Ledgerwise Core
//!
//! Domain types, traits, and error definitions for the Ledgerwise
//! personal-finance assistant. This crate has **no I/O and no framework
//! dependencies**; it defines the model that all other crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: hosted text generation (and optional embeddings)
//! - [`Vectorizer`]: text → fixed-length vector strategy
//!
//! Implementations live in their respective crates, so the retriever and
//! composer never know which backend they are talking to.

pub mod error;
pub mod knowledge;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ErrorKind, KnowledgeError, ProviderError, Result, SessionError};
pub use knowledge::{KnowledgeEntry, RankedTerm, Vector, Vectorizer};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use session::{ConversationTurn, FeedbackKind, FeedbackRecord, Session, SessionId};
