use serde::{Deserialize, Serialize};

use crate::catalog_client::CandidateTrack;

pub const DEFAULT_MIN_POPULARITY: u8 = 30;

/// Filter applied to candidates after dedup and exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPolicy {
    pub require_preview: bool,
    /// Candidates must be strictly more popular than this.
    pub min_popularity: u8,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            require_preview: true,
            min_popularity: DEFAULT_MIN_POPULARITY,
        }
    }
}

impl QualityPolicy {
    pub fn passes(&self, track: &CandidateTrack) -> bool {
        if self.require_preview && track.preview_url.is_none() {
            return false;
        }
        // min_popularity of 0 lets zero-popularity tracks through
        self.min_popularity == 0 || track.popularity > self.min_popularity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(preview: Option<&str>, popularity: u8) -> CandidateTrack {
        CandidateTrack {
            external_id: "id".into(),
            title: "t".into(),
            artist_names: vec!["a".into()],
            album_name: "al".into(),
            album_art_url: None,
            duration_ms: 1000,
            preview_url: preview.map(String::from),
            popularity,
        }
    }

    #[test]
    fn default_policy_requires_preview() {
        let policy = QualityPolicy::default();
        assert!(!policy.passes(&track(None, 90)));
        assert!(policy.passes(&track(Some("p"), 90)));
    }

    #[test]
    fn default_policy_threshold_is_exclusive() {
        let policy = QualityPolicy::default();
        assert!(!policy.passes(&track(Some("p"), 30)));
        assert!(policy.passes(&track(Some("p"), 31)));
    }

    #[test]
    fn zero_threshold_without_preview_accepts_everything() {
        let policy = QualityPolicy {
            require_preview: false,
            min_popularity: 0,
        };
        assert!(policy.passes(&track(None, 0)));
    }
}
