use super::models::SwipeSession;
use anyhow::Result;
use std::collections::HashSet;

/// Outcome of a conditional session write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionedWrite {
    /// The write went through and the record now carries `version`.
    Applied { version: u64 },
    /// The stored record moved past the version the write was based on.
    Stale,
}

pub trait SwipeSessionStore: Send + Sync {
    /// Persists a brand new session.
    /// Returns Err if a session with the same id exists or on database error.
    fn insert_session(&self, session: &SwipeSession) -> Result<()>;

    /// Returns Ok(None) if the session does not exist.
    fn get_session(&self, session_id: &str) -> Result<Option<SwipeSession>>;

    /// Writes `session` only if the stored version still equals
    /// `session.version`, bumping it on success.
    /// Updating a session that does not exist is reported as `Stale`.
    fn update_session(&self, session: &SwipeSession) -> Result<VersionedWrite>;

    /// Returns the owner's most recently created session with no completion
    /// time if there is one. Otherwise persists `session` and returns None.
    /// Lookup and insert happen atomically.
    fn insert_unless_open(&self, session: &SwipeSession) -> Result<Option<SwipeSession>>;

    /// All of the owner's sessions, newest first.
    fn owner_sessions(&self, owner_id: &str) -> Result<Vec<SwipeSession>>;

    /// Union of every key the owner ever liked or disliked, across all of
    /// their sessions.
    fn owner_track_keys(&self, owner_id: &str) -> Result<HashSet<String>>;
}
