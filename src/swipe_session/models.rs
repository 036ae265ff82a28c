use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Dislike,
}

impl SwipeAction {
    pub fn to_int(self) -> i32 {
        match self {
            SwipeAction::Like => 1,
            SwipeAction::Dislike => 2,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(SwipeAction::Like),
            2 => Some(SwipeAction::Dislike),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwipeAction::Like => "like",
            SwipeAction::Dislike => "dislike",
        }
    }
}

/// A run of like/dislike decisions owned by a single user.
///
/// A session with no `completed_at` is active. `liked_keys` and
/// `disliked_keys` never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeSession {
    pub id: String,
    pub owner_id: String,
    pub liked_keys: BTreeSet<String>,
    pub disliked_keys: BTreeSet<String>,
    pub seed_ids: Vec<String>,
    /// Unix millis.
    pub created_at: i64,
    /// Unix millis.
    pub completed_at: Option<i64>,
    /// Optimistic concurrency token, bumped by every stored write.
    pub version: u64,
}

impl SwipeSession {
    pub fn new(id: String, owner_id: String, seed_ids: Vec<String>, created_at: i64) -> Self {
        Self {
            id,
            owner_id,
            liked_keys: BTreeSet::new(),
            disliked_keys: BTreeSet::new(),
            seed_ids,
            created_at,
            completed_at: None,
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }

    /// Moves `track_key` into the set matching `action`, removing it from the
    /// other one. Returns whether anything changed.
    pub fn apply_swipe(&mut self, action: SwipeAction, track_key: &str) -> bool {
        let (target, other) = match action {
            SwipeAction::Like => (&mut self.liked_keys, &mut self.disliked_keys),
            SwipeAction::Dislike => (&mut self.disliked_keys, &mut self.liked_keys),
        };
        let removed = other.remove(track_key);
        let added = target.insert(track_key.to_string());
        removed || added
    }

    pub fn decision_for(&self, track_key: &str) -> Option<SwipeAction> {
        if self.liked_keys.contains(track_key) {
            Some(SwipeAction::Like)
        } else if self.disliked_keys.contains(track_key) {
            Some(SwipeAction::Dislike)
        } else {
            None
        }
    }

    /// Every key judged in this session, liked or disliked.
    pub fn judged_keys(&self) -> impl Iterator<Item = &String> {
        self.liked_keys.iter().chain(self.disliked_keys.iter())
    }
}
