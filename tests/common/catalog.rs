//! Deterministic in-process catalog for end-to-end tests
//!
//! The same query always yields the same tracks, so tests can swipe on what a
//! first discovery returned and check the next one excludes it.

use super::constants::*;
use async_trait::async_trait;
use swipe_server::catalog_client::{ArtistRef, CandidateTrack, CatalogClient, CatalogError};
use swipe_server::pipeline::Seed;

pub struct FakeCatalogClient;

impl FakeCatalogClient {
    fn tracks(artist: &str, label: &str, limit: usize) -> Vec<CandidateTrack> {
        (0..limit.min(FAKE_TRACKS_PER_QUERY))
            .map(|i| CandidateTrack {
                external_id: format!("{}-{}", label, i),
                title: format!("{} Song {}", label, i),
                artist_names: vec![artist.to_string()],
                album_name: format!("{} Album", label),
                album_art_url: None,
                duration_ms: 180_000,
                preview_url: if i % FAKE_NO_PREVIEW_EVERY == FAKE_NO_PREVIEW_EVERY - 1 {
                    None
                } else {
                    Some(format!("https://previews.test/{}/{}.mp3", label, i))
                },
                popularity: FAKE_POPULARITY,
            })
            .collect()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalogClient {
    async fn resolve_seed(&self, seed: &Seed) -> Result<String, CatalogError> {
        match seed {
            Seed::Artist(id) if id == KNOWN_ARTIST_ID => Ok(KNOWN_ARTIST_NAME.to_string()),
            Seed::Artist(id) | Seed::Track(id) => Err(CatalogError::NotFound(id.clone())),
            Seed::Genre(name) => Ok(name.clone()),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidateTrack>, CatalogError> {
        Ok(Self::tracks(&format!("{} Artist", query), query, limit))
    }

    async fn top_artists_for(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError> {
        if user_id == NEWCOMER {
            return Ok(Vec::new());
        }
        Ok(FAKE_TOP_ARTISTS
            .iter()
            .take(limit)
            .map(|name| ArtistRef::named(*name))
            .collect())
    }

    async fn similar_artists(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError> {
        Ok((0..limit.min(2))
            .map(|i| ArtistRef::named(format!("{} Similar {}", name, i)))
            .collect())
    }

    async fn top_tracks_for(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, CatalogError> {
        Ok(Self::tracks(artist_name, artist_name, limit))
    }
}
