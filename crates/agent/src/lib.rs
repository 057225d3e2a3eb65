//! The Ledgerwise answering pipeline.
//!
//! A chat message flows **session → knowledge → retrieval → composition →
//! persistence**:
//!
//! 1. **Resolve** the session (reuse or create, with bounded eviction)
//! 2. **Ensure** the knowledge index is built and published
//! 3. **Retrieve** the most similar knowledge terms
//! 4. **Compose** a grounded prompt from those terms and recent history
//! 5. **Persist** the completed turn and return the answer

pub mod composer;
pub mod pipeline;
pub mod sessions;

#[cfg(test)]
mod test_helpers;

pub use composer::{ResponseComposer, ASSISTANT_NAME, DEFAULT_HISTORY_WINDOW};
pub use pipeline::{ChatFailure, ChatOutcome, ChatPipeline, ChatRequest, FeedbackRequest, Stage};
pub use sessions::{SessionHandle, SessionStore, DEFAULT_EVICT_BATCH, DEFAULT_MAX_SESSIONS};
