//! Seeds in, shuffled candidate tracks out.

mod candidate_pipeline;
mod normalize;
mod quality;
mod seeds;

pub use candidate_pipeline::{finalize, CandidatePipeline, PipelineSettings};
pub use normalize::{normalize_track_key, normalized_key};
pub use quality::{QualityPolicy, DEFAULT_MIN_POPULARITY};
pub use seeds::{Seed, SeedSet, MAX_SEEDS, MIN_SEEDS};

use thiserror::Error;

/// The only ways a candidate request is rejected outright.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Expected between 1 and 5 seeds, got {0}")]
    InvalidSeedCount(usize),

    #[error("Malformed seed: {0}")]
    MalformedSeed(String),
}
