use super::models::{SwipeAction, SwipeSession};
use super::schema::{SWIPE_DECISION_TABLE_V_0, SWIPE_SESSION_TABLE_V_0, VERSIONED_SCHEMAS};
use super::store::{SwipeSessionStore, VersionedWrite};
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SESSION_COLUMNS: &str = "id, owner_id, seed_ids, created_at, completed_at, version";

pub struct SqliteSwipeSessionStore {
    conn: Arc<Mutex<Connection>>,
}

struct SessionRow {
    id: String,
    owner_id: String,
    seed_ids: String,
    created_at: i64,
    completed_at: Option<i64>,
    version: i64,
}

impl SessionRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(SessionRow {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            seed_ids: row.get(2)?,
            created_at: row.get(3)?,
            completed_at: row.get(4)?,
            version: row.get(5)?,
        })
    }
}

impl SqliteSwipeSessionStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteSwipeSessionStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Swipe session db mutex poisoned"))
    }

    fn load_session(conn: &Connection, row: SessionRow) -> Result<SwipeSession> {
        let seed_ids: Vec<String> = serde_json::from_str(&row.seed_ids)
            .with_context(|| format!("Corrupted seed ids for session {}", row.id))?;

        let mut liked_keys = BTreeSet::new();
        let mut disliked_keys = BTreeSet::new();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT track_key, decision FROM {} WHERE session_id = ?1",
            SWIPE_DECISION_TABLE_V_0.name
        ))?;
        let decisions = stmt.query_map(params![row.id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i32>(1)?))
        })?;
        for decision in decisions {
            let (track_key, decision) = decision?;
            match SwipeAction::from_int(decision) {
                Some(SwipeAction::Like) => liked_keys.insert(track_key),
                Some(SwipeAction::Dislike) => disliked_keys.insert(track_key),
                None => {
                    return Err(anyhow!(
                        "Unknown decision {} in session {}",
                        decision,
                        row.id
                    ))
                }
            };
        }

        Ok(SwipeSession {
            id: row.id,
            owner_id: row.owner_id,
            liked_keys,
            disliked_keys,
            seed_ids,
            created_at: row.created_at,
            completed_at: row.completed_at,
            version: row.version as u64,
        })
    }

    fn insert_rows(conn: &Connection, session: &SwipeSession) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                SWIPE_SESSION_TABLE_V_0.name, SESSION_COLUMNS
            ),
            params![
                session.id,
                session.owner_id,
                serde_json::to_string(&session.seed_ids)?,
                session.created_at,
                session.completed_at,
                session.version as i64,
            ],
        )
        .with_context(|| format!("Could not insert session {}", session.id))?;
        for (key, action) in session
            .liked_keys
            .iter()
            .map(|k| (k, SwipeAction::Like))
            .chain(session.disliked_keys.iter().map(|k| (k, SwipeAction::Dislike)))
        {
            conn.execute(
                &format!(
                    "INSERT INTO {} (session_id, track_key, decision) VALUES (?1, ?2, ?3)",
                    SWIPE_DECISION_TABLE_V_0.name
                ),
                params![session.id, key, action.to_int()],
            )?;
        }
        Ok(())
    }

    fn query_sessions(conn: &Connection, sql: &str, owner_id: &str) -> Result<Vec<SwipeSession>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params![owner_id], SessionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|row| Self::load_session(conn, row))
            .collect()
    }
}

impl SwipeSessionStore for SqliteSwipeSessionStore {
    fn insert_session(&self, session: &SwipeSession) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::insert_rows(&tx, session)?;
        tx.commit()?;
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<SwipeSession>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    SESSION_COLUMNS, SWIPE_SESSION_TABLE_V_0.name
                ),
                params![session_id],
                SessionRow::from_row,
            )
            .optional()?;
        row.map(|row| Self::load_session(&conn, row)).transpose()
    }

    fn update_session(&self, session: &SwipeSession) -> Result<VersionedWrite> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            &format!(
                "UPDATE {} SET seed_ids = ?1, completed_at = ?2, version = version + 1 \
                 WHERE id = ?3 AND version = ?4",
                SWIPE_SESSION_TABLE_V_0.name
            ),
            params![
                serde_json::to_string(&session.seed_ids)?,
                session.completed_at,
                session.id,
                session.version as i64,
            ],
        )?;
        if updated == 0 {
            debug!(
                "Stale write on session {} at version {}",
                session.id, session.version
            );
            return Ok(VersionedWrite::Stale);
        }

        let stored_keys: Vec<String> = {
            let mut stmt = tx.prepare_cached(&format!(
                "SELECT track_key FROM {} WHERE session_id = ?1",
                SWIPE_DECISION_TABLE_V_0.name
            ))?;
            let keys = stmt
                .query_map(params![session.id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            keys
        };
        for key in stored_keys
            .iter()
            .filter(|k| session.decision_for(k).is_none())
        {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE session_id = ?1 AND track_key = ?2",
                    SWIPE_DECISION_TABLE_V_0.name
                ),
                params![session.id, key],
            )?;
        }
        for (key, action) in session
            .liked_keys
            .iter()
            .map(|k| (k, SwipeAction::Like))
            .chain(session.disliked_keys.iter().map(|k| (k, SwipeAction::Dislike)))
        {
            tx.execute(
                &format!(
                    "INSERT INTO {} (session_id, track_key, decision) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(session_id, track_key) DO UPDATE SET decision = excluded.decision",
                    SWIPE_DECISION_TABLE_V_0.name
                ),
                params![session.id, key, action.to_int()],
            )?;
        }

        tx.commit()?;
        Ok(VersionedWrite::Applied {
            version: session.version + 1,
        })
    }

    fn insert_unless_open(&self, session: &SwipeSession) -> Result<Option<SwipeSession>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let open = Self::query_sessions(
            &tx,
            &format!(
                "SELECT {} FROM {} WHERE owner_id = ?1 AND completed_at IS NULL \
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                SESSION_COLUMNS, SWIPE_SESSION_TABLE_V_0.name
            ),
            &session.owner_id,
        )?
        .into_iter()
        .next();
        if open.is_none() {
            Self::insert_rows(&tx, session)?;
        }
        tx.commit()?;
        Ok(open)
    }

    fn owner_sessions(&self, owner_id: &str) -> Result<Vec<SwipeSession>> {
        let conn = self.lock()?;
        Self::query_sessions(
            &conn,
            &format!(
                "SELECT {} FROM {} WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
                SESSION_COLUMNS, SWIPE_SESSION_TABLE_V_0.name
            ),
            owner_id,
        )
    }

    fn owner_track_keys(&self, owner_id: &str) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT DISTINCT d.track_key FROM {} d JOIN {} s ON s.id = d.session_id \
             WHERE s.owner_id = ?1",
            SWIPE_DECISION_TABLE_V_0.name, SWIPE_SESSION_TABLE_V_0.name
        ))?;
        let keys = stmt
            .query_map(params![owner_id], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteSwipeSessionStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteSwipeSessionStore::new(temp_dir.path().join("swipe.db")).unwrap();
        (store, temp_dir)
    }

    fn session(id: &str, owner: &str, created_at: i64) -> SwipeSession {
        SwipeSession::new(
            id.to_string(),
            owner.to_string(),
            vec!["genre:pop".to_string()],
            created_at,
        )
    }

    #[test]
    fn inserts_and_reads_back_session() {
        let (store, _dir) = create_tmp_store();
        let mut s = session("s1", "alice", 1000);
        s.apply_swipe(SwipeAction::Like, "a:x");
        s.apply_swipe(SwipeAction::Dislike, "b:y");
        store.insert_session(&s).unwrap();

        let loaded = store.get_session("s1").unwrap().unwrap();
        assert_eq!(loaded, s);
        assert!(store.get_session("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_fails() {
        let (store, _dir) = create_tmp_store();
        store.insert_session(&session("s1", "alice", 1)).unwrap();
        assert!(store.insert_session(&session("s1", "bob", 2)).is_err());
    }

    #[test]
    fn update_bumps_version_and_persists_decisions() {
        let (store, _dir) = create_tmp_store();
        let mut s = session("s1", "alice", 1000);
        store.insert_session(&s).unwrap();

        s.apply_swipe(SwipeAction::Like, "a:x");
        assert_eq!(
            store.update_session(&s).unwrap(),
            VersionedWrite::Applied { version: 1 }
        );

        let mut loaded = store.get_session("s1").unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert!(loaded.liked_keys.contains("a:x"));

        loaded.apply_swipe(SwipeAction::Dislike, "a:x");
        loaded.completed_at = Some(2000);
        assert_eq!(
            store.update_session(&loaded).unwrap(),
            VersionedWrite::Applied { version: 2 }
        );
        let reloaded = store.get_session("s1").unwrap().unwrap();
        assert!(reloaded.liked_keys.is_empty());
        assert!(reloaded.disliked_keys.contains("a:x"));
        assert_eq!(reloaded.completed_at, Some(2000));
    }

    #[test]
    fn stale_update_is_rejected() {
        let (store, _dir) = create_tmp_store();
        let s = session("s1", "alice", 1000);
        store.insert_session(&s).unwrap();

        let mut first = s.clone();
        first.apply_swipe(SwipeAction::Like, "a:x");
        let mut second = s.clone();
        second.apply_swipe(SwipeAction::Like, "b:y");

        assert!(matches!(
            store.update_session(&first).unwrap(),
            VersionedWrite::Applied { .. }
        ));
        assert_eq!(store.update_session(&second).unwrap(), VersionedWrite::Stale);

        let stored = store.get_session("s1").unwrap().unwrap();
        assert!(stored.liked_keys.contains("a:x"));
        assert!(!stored.liked_keys.contains("b:y"));
    }

    #[test]
    fn updating_missing_session_is_stale() {
        let (store, _dir) = create_tmp_store();
        assert_eq!(
            store.update_session(&session("ghost", "alice", 1)).unwrap(),
            VersionedWrite::Stale
        );
    }

    #[test]
    fn insert_unless_open_skips_completed_ones() {
        let (store, _dir) = create_tmp_store();
        store.insert_session(&session("old", "alice", 1000)).unwrap();
        let mut newer = session("newer", "alice", 2000);
        newer.completed_at = Some(3000);
        store.insert_session(&newer).unwrap();
        store.insert_session(&session("other", "bob", 5000)).unwrap();

        let open = store
            .insert_unless_open(&session("fresh", "alice", 6000))
            .unwrap()
            .unwrap();
        assert_eq!(open.id, "old");
        assert!(store.get_session("fresh").unwrap().is_none());

        let carol = session("carols", "carol", 7000);
        assert!(store.insert_unless_open(&carol).unwrap().is_none());
        assert_eq!(store.get_session("carols").unwrap(), Some(carol));
    }

    #[test]
    fn concurrent_inserts_leave_one_open_session() {
        let (store, _dir) = create_tmp_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    store
                        .insert_unless_open(&session(&format!("s{}", i), "alice", 1000))
                        .unwrap()
                })
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Option::is_none)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(store.owner_sessions("alice").unwrap().len(), 1);
    }

    #[test]
    fn owner_sessions_are_newest_first() {
        let (store, _dir) = create_tmp_store();
        store.insert_session(&session("a", "alice", 1000)).unwrap();
        store.insert_session(&session("c", "alice", 3000)).unwrap();
        store.insert_session(&session("b", "alice", 2000)).unwrap();
        store.insert_session(&session("x", "bob", 4000)).unwrap();

        let ids: Vec<String> = store
            .owner_sessions("alice")
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn owner_track_keys_spans_all_sessions() {
        let (store, _dir) = create_tmp_store();
        let mut first = session("s1", "alice", 1000);
        first.apply_swipe(SwipeAction::Like, "a:x");
        first.completed_at = Some(1500);
        let mut second = session("s2", "alice", 2000);
        second.apply_swipe(SwipeAction::Dislike, "b:y");
        second.apply_swipe(SwipeAction::Like, "a:x");
        let mut foreign = session("s3", "bob", 2000);
        foreign.apply_swipe(SwipeAction::Like, "c:z");
        for s in [&first, &second, &foreign] {
            store.insert_session(s).unwrap();
        }

        let keys = store.owner_track_keys("alice").unwrap();
        assert_eq!(keys, HashSet::from(["a:x".to_string(), "b:y".to_string()]));
    }
}
