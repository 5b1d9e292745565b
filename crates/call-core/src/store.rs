//! Session storage contract and an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SessionError;
use crate::session::CallSession;

/// Result of a compare-and-swap write.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The write landed; carries the stored record with its new version.
    Swapped(CallSession),
    /// Another writer got there first; re-read and retry.
    Conflict,
}

impl CasOutcome {
    pub fn is_swapped(&self) -> bool {
        matches!(self, CasOutcome::Swapped(_))
    }
}

/// Storage for per-call sessions.
///
/// Every successful write bumps the record's `version`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for a call.
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, SessionError>;

    /// Write a session unconditionally, returning the stored record.
    async fn upsert(&self, session: CallSession) -> Result<CallSession, SessionError>;

    /// Write a session only if the stored version equals `session.version`.
    ///
    /// Returns [`SessionError::NotFound`] when no session exists for the call.
    async fn compare_and_swap(&self, session: CallSession) -> Result<CasOutcome, SessionError>;
}

/// Thread-safe in-memory session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, CallSession>>,
}

impl InMemorySessionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a session when its call ends.
    pub async fn remove(&self, call_id: &str) -> Option<CallSession> {
        self.sessions.write().await.remove(call_id)
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, SessionError> {
        Ok(self.sessions.read().await.get(call_id).cloned())
    }

    async fn upsert(&self, mut session: CallSession) -> Result<CallSession, SessionError> {
        let mut sessions = self.sessions.write().await;
        let current = sessions.get(&session.call_id).map(|s| s.version).unwrap_or(0);
        session.version = current + 1;
        sessions.insert(session.call_id.clone(), session.clone());
        Ok(session)
    }

    async fn compare_and_swap(&self, mut session: CallSession) -> Result<CasOutcome, SessionError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get(&session.call_id)
            .ok_or_else(|| SessionError::NotFound(session.call_id.clone()))?;

        if stored.version != session.version {
            debug!(
                "CAS conflict for {}: expected v{}, found v{}",
                session.call_id, session.version, stored.version
            );
            return Ok(CasOutcome::Conflict);
        }

        session.version += 1;
        sessions.insert(session.call_id.clone(), session.clone());
        Ok(CasOutcome::Swapped(session))
    }
}
