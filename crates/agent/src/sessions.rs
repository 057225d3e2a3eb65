//! In-memory session store with a hard capacity bound.
//!
//! Sessions live for the process lifetime. When creating a session pushes
//! the live count past `max_sessions`, the `evict_batch` oldest sessions by
//! creation time are removed in one pass. Age is never refreshed by activity.

use chrono::{DateTime, Utc};
use ledgerwise_config::SessionConfig;
use ledgerwise_core::error::SessionError;
use ledgerwise_core::session::{FeedbackRecord, Session, SessionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

/// Default live-session cap.
pub const DEFAULT_MAX_SESSIONS: usize = 1_000;
/// Default number of sessions removed per eviction pass.
pub const DEFAULT_EVICT_BATCH: usize = 100;

struct SessionSlot {
    created_at: DateTime<Utc>,
    /// Creation order, breaks `created_at` ties.
    seq: u64,
    session: Arc<Mutex<Session>>,
}

/// Process-lifetime mapping from session id to conversation state.
///
/// The map lock guards creation and eviction; each session has its own
/// mutex guarding its turns and feedback.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    next_seq: AtomicU64,
    max_sessions: usize,
    evict_batch: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize, evict_batch: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            max_sessions,
            evict_batch,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.max_sessions, config.evict_batch)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Resolve `id` to a live session, creating a new one with a fresh id
    /// when `id` is absent or unknown. Returns the id and whether it was
    /// newly created.
    pub async fn get_or_create(&self, id: Option<&str>) -> (SessionId, bool) {
        let handle = self.checkout(id).await;
        (handle.id, handle.created)
    }

    /// Like [`get_or_create`](Self::get_or_create), but the returned handle
    /// pins the session: eviction skips it until the handle is dropped.
    pub async fn checkout(&self, id: Option<&str>) -> SessionHandle {
        if let Some(id) = id {
            if let Some(slot) = self.sessions.read().await.get(id) {
                return SessionHandle::existing(id, slot);
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(id) = id {
            if let Some(slot) = sessions.get(id) {
                return SessionHandle::existing(id, slot);
            }
        }

        let mut session_id = SessionId::new();
        while sessions.contains_key(session_id.as_str()) {
            session_id = SessionId::new();
        }

        let session = Session::with_id(session_id.clone());
        let slot = SessionSlot {
            created_at: session.created_at,
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            session: Arc::new(Mutex::new(session)),
        };
        let handle = SessionHandle {
            id: session_id.clone(),
            created: true,
            session: slot.session.clone(),
        };
        sessions.insert(session_id.to_string(), slot);
        debug!(session_id = %session_id, live = sessions.len(), "Session created");

        if sessions.len() > self.max_sessions {
            Self::evict_oldest(&mut sessions, self.evict_batch);
        }

        handle
    }

    /// Remove up to `count` of the oldest sessions. Sessions pinned by a
    /// [`SessionHandle`] or an acquired guard are skipped, so a pass may
    /// remove fewer than `count`.
    fn evict_oldest(sessions: &mut HashMap<String, SessionSlot>, count: usize) {
        let mut candidates: Vec<(DateTime<Utc>, u64, String)> = sessions
            .iter()
            .filter(|(_, slot)| Arc::strong_count(&slot.session) == 1)
            .map(|(id, slot)| (slot.created_at, slot.seq, id.clone()))
            .collect();
        candidates.sort();

        let mut evicted = 0usize;
        for (_, _, id) in candidates.into_iter().take(count) {
            sessions.remove(&id);
            evicted += 1;
        }

        info!(evicted, live = sessions.len(), "Evicted oldest sessions");
    }

    /// Exclusive access to one session for the duration of a request.
    pub async fn acquire(&self, id: &str) -> Result<OwnedMutexGuard<Session>, SessionError> {
        let session = self
            .sessions
            .read()
            .await
            .get(id)
            .map(|slot| slot.session.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(session.lock_owned().await)
    }

    /// Append a new incomplete turn; returns its index.
    pub async fn append_user_turn(&self, id: &str, text: &str) -> Result<usize, SessionError> {
        let mut session = self.acquire(id).await?;
        Ok(session.append_user_turn(text))
    }

    /// Complete the most recently appended turn.
    pub async fn complete_last_turn(&self, id: &str, bot_text: &str) -> Result<(), SessionError> {
        let mut session = self.acquire(id).await?;
        session.complete_last_turn(bot_text)
    }

    /// Drop the last turn if it is still incomplete.
    pub async fn discard_pending_turn(&self, id: &str) -> Result<bool, SessionError> {
        let mut session = self.acquire(id).await?;
        Ok(session.discard_pending_turn())
    }

    /// Record feedback. Never creates a session.
    pub async fn append_feedback(&self, id: &str, record: FeedbackRecord) -> Result<(), SessionError> {
        let mut session = self.acquire(id).await?;
        session.feedback.push(record);
        Ok(())
    }

    /// A point-in-time copy of a session.
    pub async fn snapshot(&self, id: &str) -> Option<Session> {
        match self.acquire(id).await {
            Ok(session) => Some(session.clone()),
            Err(_) => None,
        }
    }
}

/// A request's claim on one live session.
pub struct SessionHandle {
    id: SessionId,
    created: bool,
    session: Arc<Mutex<Session>>,
}

impl SessionHandle {
    fn existing(id: &str, slot: &SessionSlot) -> Self {
        Self {
            id: SessionId(id.to_string()),
            created: false,
            session: slot.session.clone(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether this checkout created the session.
    pub fn is_new(&self) -> bool {
        self.created
    }

    /// Exclusive access to the session's turns and feedback.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS, DEFAULT_EVICT_BATCH)
    }
}
