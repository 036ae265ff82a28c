use super::models::SwipeSession;
use super::store::{SwipeSessionStore, VersionedWrite};
use anyhow::{anyhow, bail, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Process-local store, used by tests and when running without a database.
#[derive(Default)]
pub struct InMemorySwipeSessionStore {
    // session id -> (insertion sequence, session)
    sessions: Mutex<HashMap<String, (u64, SwipeSession)>>,
}

impl InMemorySwipeSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, (u64, SwipeSession)>>> {
        self.sessions
            .lock()
            .map_err(|_| anyhow!("Swipe session map mutex poisoned"))
    }

    fn owned_newest_first(
        sessions: &HashMap<String, (u64, SwipeSession)>,
        owner_id: &str,
    ) -> Vec<SwipeSession> {
        let mut owned: Vec<&(u64, SwipeSession)> = sessions
            .values()
            .filter(|(_, s)| s.owner_id == owner_id)
            .collect();
        owned.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        owned.into_iter().map(|(_, s)| s.clone()).collect()
    }

    fn insert_locked(
        sessions: &mut HashMap<String, (u64, SwipeSession)>,
        session: &SwipeSession,
    ) -> Result<()> {
        if sessions.contains_key(&session.id) {
            bail!("Session {} already exists", session.id);
        }
        let seq = sessions.len() as u64;
        sessions.insert(session.id.clone(), (seq, session.clone()));
        Ok(())
    }
}

impl SwipeSessionStore for InMemorySwipeSessionStore {
    fn insert_session(&self, session: &SwipeSession) -> Result<()> {
        let mut sessions = self.lock()?;
        Self::insert_locked(&mut sessions, session)
    }

    fn get_session(&self, session_id: &str) -> Result<Option<SwipeSession>> {
        Ok(self.lock()?.get(session_id).map(|(_, s)| s.clone()))
    }

    fn update_session(&self, session: &SwipeSession) -> Result<VersionedWrite> {
        let mut sessions = self.lock()?;
        let Some((_, stored)) = sessions.get_mut(&session.id) else {
            return Ok(VersionedWrite::Stale);
        };
        if stored.version != session.version {
            return Ok(VersionedWrite::Stale);
        }
        *stored = session.clone();
        stored.version = session.version + 1;
        Ok(VersionedWrite::Applied {
            version: stored.version,
        })
    }

    fn insert_unless_open(&self, session: &SwipeSession) -> Result<Option<SwipeSession>> {
        let mut sessions = self.lock()?;
        let open = Self::owned_newest_first(&sessions, &session.owner_id)
            .into_iter()
            .find(SwipeSession::is_active);
        if open.is_none() {
            Self::insert_locked(&mut sessions, session)?;
        }
        Ok(open)
    }

    fn owner_sessions(&self, owner_id: &str) -> Result<Vec<SwipeSession>> {
        let sessions = self.lock()?;
        Ok(Self::owned_newest_first(&sessions, owner_id))
    }

    fn owner_track_keys(&self, owner_id: &str) -> Result<HashSet<String>> {
        let sessions = self.lock()?;
        Ok(sessions
            .values()
            .filter(|(_, s)| s.owner_id == owner_id)
            .flat_map(|(_, s)| s.judged_keys().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swipe_session::SwipeAction;

    #[test]
    fn rejects_stale_writes() {
        let store = InMemorySwipeSessionStore::new();
        let s = SwipeSession::new("s1".into(), "alice".into(), vec![], 1);
        store.insert_session(&s).unwrap();

        let mut first = s.clone();
        first.apply_swipe(SwipeAction::Like, "k");
        assert_eq!(
            store.update_session(&first).unwrap(),
            VersionedWrite::Applied { version: 1 }
        );
        assert_eq!(store.update_session(&s).unwrap(), VersionedWrite::Stale);
    }

    #[test]
    fn ties_on_creation_time_prefer_latest_insert() {
        let store = InMemorySwipeSessionStore::new();
        store
            .insert_session(&SwipeSession::new("first".into(), "alice".into(), vec![], 5))
            .unwrap();
        store
            .insert_session(&SwipeSession::new("second".into(), "alice".into(), vec![], 5))
            .unwrap();

        let candidate = SwipeSession::new("third".into(), "alice".into(), vec![], 9);
        let latest = store.insert_unless_open(&candidate).unwrap().unwrap();
        assert_eq!(latest.id, "second");
        assert!(store.get_session("third").unwrap().is_none());
    }

    #[test]
    fn inserts_when_no_session_is_open() {
        let store = InMemorySwipeSessionStore::new();
        let mut done = SwipeSession::new("done".into(), "alice".into(), vec![], 1);
        done.completed_at = Some(2);
        store.insert_session(&done).unwrap();

        let candidate = SwipeSession::new("fresh".into(), "alice".into(), vec![], 3);
        assert!(store.insert_unless_open(&candidate).unwrap().is_none());
        assert_eq!(store.get_session("fresh").unwrap(), Some(candidate));
    }
}
