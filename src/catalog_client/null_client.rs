//! Null catalog client.
//!
//! Used when no catalog gateway is configured: every call fails with
//! `CatalogError::Unavailable`, so candidate generation degrades to an empty
//! list while swipe sessions keep working.

use async_trait::async_trait;

use super::models::{ArtistRef, CandidateTrack};
use super::trait_def::{CatalogClient, CatalogError};
use crate::pipeline::Seed;

pub struct NullCatalogClient;

#[async_trait]
impl CatalogClient for NullCatalogClient {
    async fn resolve_seed(&self, _seed: &Seed) -> Result<String, CatalogError> {
        Err(CatalogError::Unavailable)
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<CandidateTrack>, CatalogError> {
        Err(CatalogError::Unavailable)
    }

    async fn top_artists_for(
        &self,
        _user_id: &str,
        _limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError> {
        Err(CatalogError::Unavailable)
    }

    async fn similar_artists(
        &self,
        _name: &str,
        _limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError> {
        Err(CatalogError::Unavailable)
    }

    async fn top_tracks_for(
        &self,
        _artist_name: &str,
        _limit: usize,
    ) -> Result<Vec<CandidateTrack>, CatalogError> {
        Err(CatalogError::Unavailable)
    }
}
