use serde::{Deserialize, Serialize};

use crate::pipeline::normalized_key;

/// A track eligible to be shown to a swiping user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTrack {
    /// The catalog's own identifier for the track.
    pub external_id: String,
    pub title: String,
    /// Artist names, primary artist first.
    pub artist_names: Vec<String>,
    pub album_name: String,
    pub album_art_url: Option<String>,
    pub duration_ms: u64,
    pub preview_url: Option<String>,
    /// 0..=100
    pub popularity: u8,
}

impl CandidateTrack {
    pub fn primary_artist(&self) -> &str {
        self.artist_names.first().map(String::as_str).unwrap_or("")
    }

    /// Key used for cross-source dedup and exclusion matching.
    pub fn normalized_key(&self) -> String {
        normalized_key(self.primary_artist(), &self.title)
    }
}

/// A reference to an artist as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

impl ArtistRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}
