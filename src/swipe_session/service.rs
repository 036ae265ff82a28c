use super::models::{SwipeAction, SwipeSession};
use super::store::{SwipeSessionStore, VersionedWrite};
use crate::pipeline::normalize_track_key;
use crate::server::metrics;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session belongs to another user")]
    Forbidden,

    #[error("Concurrent updates kept conflicting on session {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Entry point for every swipe session operation. Enforces ownership and
/// turns session updates into conditional writes, retrying stale ones.
pub struct SessionService {
    store: Arc<dyn SwipeSessionStore>,
    max_write_attempts: usize,
}

impl SessionService {
    pub fn new(store: Arc<dyn SwipeSessionStore>, max_write_attempts: usize) -> Self {
        Self {
            store,
            max_write_attempts: max_write_attempts.max(1),
        }
    }

    pub fn create(&self, owner_id: &str, seed_ids: Vec<String>) -> Result<SwipeSession, SessionError> {
        let session = Self::new_session(owner_id, seed_ids);
        self.store.insert_session(&session)?;
        Self::log_created(&session);
        Ok(session)
    }

    pub fn get(&self, session_id: &str, caller_id: &str) -> Result<SwipeSession, SessionError> {
        self.load_owned(session_id, caller_id)
    }

    /// The caller's most recent open session, created on the spot if there
    /// is none.
    pub fn active_session(
        &self,
        caller_id: &str,
        seed_ids: Vec<String>,
    ) -> Result<SwipeSession, SessionError> {
        let fresh = Self::new_session(caller_id, seed_ids);
        match self.store.insert_unless_open(&fresh)? {
            Some(open) => Ok(open),
            None => {
                Self::log_created(&fresh);
                Ok(fresh)
            }
        }
    }

    pub fn list_sessions(&self, caller_id: &str) -> Result<Vec<SwipeSession>, SessionError> {
        Ok(self.store.owner_sessions(caller_id)?)
    }

    /// Records a like or dislike. Repeating the same decision is a no-op and
    /// a reversed decision moves the key to the other set.
    pub fn record_swipe(
        &self,
        session_id: &str,
        caller_id: &str,
        action: SwipeAction,
        track_key: &str,
    ) -> Result<SwipeSession, SessionError> {
        let track_key = normalize_track_key(track_key);
        if track_key.is_empty() || track_key == ":" {
            return Err(SessionError::InvalidInput("empty track key".to_string()));
        }
        let session = self.modify(session_id, caller_id, "swipe", |session| {
            session.apply_swipe(action, &track_key)
        })?;
        metrics::record_swipe(action.as_str());
        Ok(session)
    }

    /// Marks the session completed. Completing an already completed session
    /// refreshes its completion time.
    pub fn complete(&self, session_id: &str, caller_id: &str) -> Result<SwipeSession, SessionError> {
        let session = self.modify(session_id, caller_id, "complete", |session| {
            session.completed_at = Some(Utc::now().timestamp_millis());
            true
        })?;
        info!("Completed swipe session {}", session_id);
        Ok(session)
    }

    /// Every key the owner ever liked or disliked, in any session.
    pub fn exclusion_set_for(&self, owner_id: &str) -> Result<HashSet<String>, SessionError> {
        Ok(self.store.owner_track_keys(owner_id)?)
    }

    fn new_session(owner_id: &str, seed_ids: Vec<String>) -> SwipeSession {
        SwipeSession::new(
            Uuid::new_v4().to_string(),
            owner_id.to_string(),
            seed_ids,
            Utc::now().timestamp_millis(),
        )
    }

    fn log_created(session: &SwipeSession) {
        info!("Created swipe session {} for {}", session.id, session.owner_id);
        metrics::record_session_created();
    }

    fn load_owned(&self, session_id: &str, caller_id: &str) -> Result<SwipeSession, SessionError> {
        let session = self
            .store
            .get_session(session_id)?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if session.owner_id != caller_id {
            warn!(
                "User {} tried to access session {} owned by someone else",
                caller_id, session_id
            );
            return Err(SessionError::Forbidden);
        }
        Ok(session)
    }

    /// Read-modify-write loop. `mutate` returns false when it changed
    /// nothing, in which case no write happens.
    fn modify<F>(
        &self,
        session_id: &str,
        caller_id: &str,
        operation: &str,
        mutate: F,
    ) -> Result<SwipeSession, SessionError>
    where
        F: Fn(&mut SwipeSession) -> bool,
    {
        for attempt in 1..=self.max_write_attempts {
            let mut session = self.load_owned(session_id, caller_id)?;
            if !mutate(&mut session) {
                return Ok(session);
            }
            match self.store.update_session(&session)? {
                VersionedWrite::Applied { version } => {
                    session.version = version;
                    return Ok(session);
                }
                VersionedWrite::Stale => {
                    debug!(
                        "Stale {} on session {}, attempt {}/{}",
                        operation, session_id, attempt, self.max_write_attempts
                    );
                    metrics::record_session_write_retry(operation);
                }
            }
        }
        warn!(
            "Giving up {} on session {} after {} attempts",
            operation, session_id, self.max_write_attempts
        );
        metrics::record_session_conflict(operation);
        Err(SessionError::Conflict(session_id.to_string()))
    }
}
