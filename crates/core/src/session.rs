//! Session, conversation turn, and feedback domain types.
//!
//! A session is a client-scoped conversation context. Turns are strictly
//! append-ordered; a turn starts with only the user's text and is completed
//! once the assistant has answered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user message and, once produced, the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub user_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_text: Option<String>,
}

impl ConversationTurn {
    /// A new, incomplete turn.
    pub fn pending(user_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            bot_text: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.bot_text.is_some()
    }
}

/// Thumbs-up or thumbs-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

/// User feedback on one assistant message. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub turn_index: i64,
    #[serde(default)]
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(kind: FeedbackKind, turn_index: i64, text: Option<String>) -> Self {
        Self {
            kind,
            turn_index,
            text: text.unwrap_or_default(),
            timestamp: Utc::now(),
        }
    }
}

/// A live conversation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub conversation: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub feedback: Vec<FeedbackRecord>,
}

impl Session {
    /// A fresh, empty session with a newly generated id.
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            conversation: Vec::new(),
            created_at: Utc::now(),
            feedback: Vec::new(),
        }
    }

    /// Number of turns in the conversation.
    pub fn len(&self) -> usize {
        self.conversation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_empty()
    }

    /// Append a new incomplete turn and return its index.
    pub fn append_user_turn(&mut self, text: impl Into<String>) -> usize {
        self.conversation.push(ConversationTurn::pending(text));
        self.conversation.len() - 1
    }

    /// Complete the most recent turn. Fails if it is already complete or
    /// the conversation is empty.
    pub fn complete_last_turn(&mut self, bot_text: impl Into<String>) -> Result<(), SessionError> {
        match self.conversation.last_mut() {
            Some(turn) if !turn.is_complete() => {
                turn.bot_text = Some(bot_text.into());
                Ok(())
            }
            _ => Err(SessionError::NoPendingTurn(self.id.to_string())),
        }
    }

    /// Drop the most recent turn if it is still incomplete.
    pub fn discard_pending_turn(&mut self) -> bool {
        if self.conversation.last().is_some_and(|t| !t.is_complete()) {
            self.conversation.pop();
            true
        } else {
            false
        }
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.conversation.len().saturating_sub(n);
        &self.conversation[start..]
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
