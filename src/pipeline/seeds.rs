use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::PipelineError;

pub const MIN_SEEDS: usize = 1;
pub const MAX_SEEDS: usize = 5;

/// Something that biases candidate generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Seed {
    Artist(String),
    Track(String),
    Genre(String),
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Artist(id) => write!(f, "artist:{}", id),
            Seed::Track(id) => write!(f, "track:{}", id),
            Seed::Genre(name) => write!(f, "genre:{}", name),
        }
    }
}

impl FromStr for Seed {
    type Err = PipelineError;

    /// Parses `artist:ID`, `track:ID` or `genre:NAME`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| PipelineError::MalformedSeed(s.to_string()))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(PipelineError::MalformedSeed(s.to_string()));
        }
        match kind.trim().to_ascii_lowercase().as_str() {
            "artist" => Ok(Seed::Artist(value.to_string())),
            "track" => Ok(Seed::Track(value.to_string())),
            "genre" => Ok(Seed::Genre(value.to_string())),
            _ => Err(PipelineError::MalformedSeed(s.to_string())),
        }
    }
}

/// Between `MIN_SEEDS` and `MAX_SEEDS` seeds, counted across all kinds.
///
/// Out of range sets are rejected, never truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSet(Vec<Seed>);

impl SeedSet {
    pub fn seeds(&self) -> &[Seed] {
        &self.0
    }
}

impl TryFrom<Vec<Seed>> for SeedSet {
    type Error = PipelineError;

    fn try_from(seeds: Vec<Seed>) -> Result<Self, Self::Error> {
        if seeds.len() < MIN_SEEDS || seeds.len() > MAX_SEEDS {
            return Err(PipelineError::InvalidSeedCount(seeds.len()));
        }
        Ok(SeedSet(seeds))
    }
}
