//! Catalog capability trait.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{ArtistRef, CandidateTrack};
use crate::pipeline::Seed;

/// Errors surfaced by a catalog call. The pipeline logs and absorbs all of
/// them; none is ever returned to a client.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Catalog not configured")]
    Unavailable,
}

impl CatalogError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Connection(_) => "connection",
            CatalogError::Api { .. } => "api",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::RateLimited => "rate_limited",
            CatalogError::Timeout => "timeout",
            CatalogError::InvalidResponse(_) => "invalid_response",
            CatalogError::Unavailable => "unavailable",
        }
    }
}

/// The external music catalog, consumed as a capability.
///
/// Every call is assumed to be rate limited and individually fallible.
/// Implementations isolate the pipeline from the upstream API's field naming
/// and pagination.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Waits until the catalog accepts another request. Callers await this
    /// before each call, outside of any per-call timeout.
    async fn wait_for_slot(&self) {}

    /// Resolves an artist or track seed to a canonical artist name.
    /// Genre seeds are not resolved through the catalog.
    async fn resolve_seed(&self, seed: &Seed) -> Result<String, CatalogError>;

    /// Searches tracks matching `query`, returning at most `limit` results.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidateTrack>, CatalogError>;

    /// The user's most listened artists.
    async fn top_artists_for(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError>;

    /// Artists similar to the one named `name`.
    async fn similar_artists(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError>;

    /// The most popular tracks of the artist named `artist_name`.
    async fn top_tracks_for(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, CatalogError>;
}
