//! Chat pipeline: one request through session, retrieval, composition,
//! and persistence.
//!
//! # Flow
//!
//! 1. **Received**: validate the message
//! 2. **SessionResolved**: reuse or create the session
//! 3. **KnowledgeReady**: ensure the index exists (lazy, first request pays)
//! 4. **Retrieved**: rank knowledge terms against the message
//! 5. **Composed**: append the user turn and generate the answer
//! 6. **Persisted**: complete the turn with the answer
//! 7. **Responded**
//!
//! Any failure goes straight to **Failed**. The caller still gets the
//! session id so it can retry in the same session. Unless configured to
//! retain them, a failed request's user turn is rolled back.

use ledgerwise_config::AppConfig;
use ledgerwise_core::error::{Error, SessionError};
use ledgerwise_core::provider::Provider;
use ledgerwise_core::session::{FeedbackKind, FeedbackRecord, SessionId};
use ledgerwise_knowledge::{retrieve, KnowledgeBase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::composer::ResponseComposer;
use crate::sessions::{SessionHandle, SessionStore};

/// Per-request pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    SessionResolved,
    KnowledgeReady,
    Retrieved,
    Composed,
    Persisted,
    Responded,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::SessionResolved => "session_resolved",
            Self::KnowledgeReady => "knowledge_ready",
            Self::Retrieved => "retrieved",
            Self::Composed => "composed",
            Self::Persisted => "persisted",
            Self::Responded => "responded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming chat message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            session_id: None,
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Successful chat result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub session_id: SessionId,
    pub response: String,
    pub relevant_terms: Vec<String>,
}

/// A failed chat request, carrying the session id when one was resolved.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ChatFailure {
    pub session_id: Option<SessionId>,
    pub error: Error,
}

/// Feedback on one assistant message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<FeedbackKind>,
    #[serde(default)]
    pub message_index: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
}

pub struct ChatPipeline {
    knowledge: Arc<KnowledgeBase>,
    sessions: Arc<SessionStore>,
    composer: ResponseComposer,
    retain_failed_turns: bool,
}

impl ChatPipeline {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        sessions: Arc<SessionStore>,
        composer: ResponseComposer,
    ) -> Self {
        Self {
            knowledge,
            sessions,
            composer,
            retain_failed_turns: false,
        }
    }

    /// Keep the user turn of a failed request instead of rolling it back.
    pub fn with_retain_failed_turns(mut self, retain: bool) -> Self {
        self.retain_failed_turns = retain;
        self
    }

    /// Wire the knowledge base, session store, and composer from config.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, Error> {
        let knowledge = KnowledgeBase::from_config(&config.knowledge, Some(provider.clone()))?;
        let sessions = SessionStore::from_config(&config.sessions);
        let composer = ResponseComposer::from_config(provider, config);

        Ok(Self::new(Arc::new(knowledge), Arc::new(sessions), composer)
            .with_retain_failed_turns(config.sessions.retain_failed_turns))
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn composer(&self) -> &ResponseComposer {
        &self.composer
    }

    /// Handle one chat message end to end.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, ChatFailure> {
        let started = Instant::now();
        let mut stage = Stage::Received;

        let message = match request.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m,
            _ => {
                advance(&mut stage, Stage::Failed, None);
                return Err(ChatFailure {
                    session_id: None,
                    error: Error::InvalidInput("message is required".into()),
                });
            }
        };

        // The handle pins the session against eviction until this request ends.
        let session = self.sessions.checkout(request.session_id.as_deref()).await;
        let session_id = session.id().clone();
        advance(&mut stage, Stage::SessionResolved, Some(&session_id));
        if session.is_new() {
            debug!(session_id = %session_id, "New session");
        }

        match self.run(&session, message, &mut stage).await {
            Ok((response, relevant_terms)) => {
                advance(&mut stage, Stage::Responded, Some(&session_id));
                info!(
                    session_id = %session_id,
                    terms = ?relevant_terms,
                    response_len = response.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Chat request answered"
                );
                Ok(ChatOutcome {
                    session_id,
                    response,
                    relevant_terms,
                })
            }
            Err(error) => {
                let failed_at = stage;
                advance(&mut stage, Stage::Failed, Some(&session_id));
                warn!(
                    session_id = %session_id,
                    stage = %failed_at,
                    kind = %error.kind(),
                    error = %error,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Chat request failed"
                );
                Err(ChatFailure {
                    session_id: Some(session_id),
                    error,
                })
            }
        }
    }

    async fn run(
        &self,
        handle: &SessionHandle,
        message: &str,
        stage: &mut Stage,
    ) -> Result<(String, Vec<String>), Error> {
        let session_id = handle.id();
        let index = self.knowledge.ensure_index().await?;
        advance(stage, Stage::KnowledgeReady, Some(session_id));

        let ranked = retrieve(
            self.knowledge.vectorizer(),
            message,
            &index,
            self.knowledge.top_k(),
        )
        .await?;
        advance(stage, Stage::Retrieved, Some(session_id));

        // Held until the turn is completed so concurrent requests on one
        // session cannot interleave their turns.
        let mut session = handle.lock().await;
        session.append_user_turn(message);

        let response = match self
            .composer
            .compose(message, &session.conversation, &ranked, self.knowledge.store())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                if !self.retain_failed_turns {
                    session.discard_pending_turn();
                }
                return Err(e.into());
            }
        };
        advance(stage, Stage::Composed, Some(session_id));

        session.complete_last_turn(response.as_str())?;
        advance(stage, Stage::Persisted, Some(session_id));

        Ok((response, ranked.into_iter().map(|r| r.term).collect()))
    }

    /// Record feedback for an existing session. Never creates a session.
    pub async fn submit_feedback(&self, request: FeedbackRequest) -> Result<(), Error> {
        let session_id = request
            .session_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SessionError::NotFound("<missing>".into()))?;

        if !self.sessions.contains(session_id).await {
            return Err(SessionError::NotFound(session_id.to_string()).into());
        }

        let kind = request
            .kind
            .ok_or_else(|| Error::InvalidInput("type must be 'positive' or 'negative'".into()))?;
        let message_index = request
            .message_index
            .ok_or_else(|| Error::InvalidInput("messageIndex is required".into()))?;

        self.sessions
            .append_feedback(
                session_id,
                FeedbackRecord::new(kind, message_index, request.text),
            )
            .await?;

        info!(session_id, ?kind, message_index, "Feedback recorded");
        Ok(())
    }
}

fn advance(stage: &mut Stage, next: Stage, session_id: Option<&SessionId>) {
    debug!(
        session_id = session_id.map(SessionId::as_str).unwrap_or("-"),
        from = %stage,
        to = %next,
        "Pipeline stage"
    );
    *stage = next;
}
