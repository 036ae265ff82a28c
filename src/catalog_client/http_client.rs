//! HTTP adapter for the catalog gateway.
//!
//! The gateway speaks a Spotify-shaped JSON dialect. Everything specific to
//! that dialect (nested album images, optional fields, paging wrappers) stays
//! in this file; the rest of the server only sees `CandidateTrack` and
//! `ArtistRef`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::models::{ArtistRef, CandidateTrack};
use super::trait_def::{CatalogClient, CatalogError};
use crate::pipeline::Seed;

pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    min_request_interval: Duration,
    next_slot: Mutex<Instant>,
}

#[derive(Debug, Deserialize)]
struct UpstreamArtist {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamImage {
    url: String,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UpstreamAlbum {
    name: Option<String>,
    #[serde(default)]
    images: Vec<UpstreamImage>,
}

#[derive(Debug, Deserialize)]
struct UpstreamTrack {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<UpstreamArtist>,
    album: Option<UpstreamAlbum>,
    duration_ms: Option<u64>,
    preview_url: Option<String>,
    popularity: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging<UpstreamTrack>>,
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    #[serde(default)]
    tracks: Vec<UpstreamTrack>,
}

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    #[serde(default)]
    artists: Vec<UpstreamArtist>,
}

impl UpstreamTrack {
    /// Tracks without an id, title or artist are unusable and get dropped.
    fn into_candidate(self) -> Option<CandidateTrack> {
        let external_id = self.id.filter(|id| !id.is_empty())?;
        let title = self.name.filter(|name| !name.is_empty())?;
        let artist_names: Vec<String> = self
            .artists
            .into_iter()
            .filter_map(|a| a.name)
            .filter(|name| !name.is_empty())
            .collect();
        if artist_names.is_empty() {
            return None;
        }

        let (album_name, album_art_url) = match self.album {
            Some(album) => {
                let art = album
                    .images
                    .into_iter()
                    .max_by_key(|image| image.width.unwrap_or(0))
                    .map(|image| image.url);
                (album.name.unwrap_or_default(), art)
            }
            None => (String::new(), None),
        };

        Some(CandidateTrack {
            external_id,
            title,
            artist_names,
            album_name,
            album_art_url,
            duration_ms: self.duration_ms.unwrap_or(0),
            preview_url: self.preview_url.filter(|url| !url.is_empty()),
            popularity: self.popularity.unwrap_or(0).min(100) as u8,
        })
    }
}

impl UpstreamArtist {
    fn into_artist_ref(self) -> Option<ArtistRef> {
        let name = self.name.filter(|name| !name.is_empty())?;
        Some(ArtistRef {
            id: self.id.filter(|id| !id.is_empty()),
            name,
        })
    }
}

fn into_candidates(tracks: Vec<UpstreamTrack>) -> Vec<CandidateTrack> {
    tracks
        .into_iter()
        .filter_map(UpstreamTrack::into_candidate)
        .collect()
}

fn into_artist_refs(artists: Vec<UpstreamArtist>) -> Vec<ArtistRef> {
    artists
        .into_iter()
        .filter_map(UpstreamArtist::into_artist_ref)
        .collect()
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if err.is_decode() {
            CatalogError::InvalidResponse(err.to_string())
        } else {
            CatalogError::Connection(err.to_string())
        }
    }
}

impl HttpCatalogClient {
    /// Create a new catalog client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the catalog gateway (e.g., "http://localhost:8080/v1")
    /// * `api_token` - Optional bearer token sent with every request
    /// * `timeout` - Per-request timeout
    /// * `min_request_interval` - Minimum spacing between two requests
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
        min_request_interval: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_token,
            min_request_interval,
            next_slot: Mutex::new(Instant::now()),
        })
    }

    /// Reserves the next free request slot. The lock is released before
    /// sleeping, so concurrent callers queue up in slot order.
    async fn reserve_slot(&self) -> Instant {
        let mut next = self.next_slot.lock().await;
        let slot = (*next).max(Instant::now());
        *next = slot + self.min_request_interval;
        slot
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("Catalog request GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                404 => CatalogError::NotFound(path_and_query.to_string()),
                429 => CatalogError::RateLimited,
                code => CatalogError::Api {
                    status: code,
                    message: response.text().await.unwrap_or_default(),
                },
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn wait_for_slot(&self) {
        let slot = self.reserve_slot().await;
        tokio::time::sleep_until(slot).await;
    }

    async fn resolve_seed(&self, seed: &Seed) -> Result<String, CatalogError> {
        match seed {
            Seed::Artist(id) => {
                let artist: UpstreamArtist = self
                    .get_json(&format!("/artists/{}", urlencoding::encode(id)))
                    .await?;
                artist
                    .into_artist_ref()
                    .map(|a| a.name)
                    .ok_or_else(|| CatalogError::InvalidResponse(format!("artist {} has no name", id)))
            }
            Seed::Track(id) => {
                let track: UpstreamTrack = self
                    .get_json(&format!("/tracks/{}", urlencoding::encode(id)))
                    .await?;
                track
                    .artists
                    .into_iter()
                    .find_map(UpstreamArtist::into_artist_ref)
                    .map(|a| a.name)
                    .ok_or_else(|| CatalogError::InvalidResponse(format!("track {} has no artist", id)))
            }
            Seed::Genre(genre) => Ok(genre.clone()),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidateTrack>, CatalogError> {
        let response: SearchResponse = self
            .get_json(&format!(
                "/search?type=track&q={}&limit={}",
                urlencoding::encode(query),
                limit
            ))
            .await?;
        Ok(response
            .tracks
            .map(|paging| into_candidates(paging.items))
            .unwrap_or_default())
    }

    async fn top_artists_for(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError> {
        let response: Paging<UpstreamArtist> = self
            .get_json(&format!(
                "/users/{}/top/artists?limit={}",
                urlencoding::encode(user_id),
                limit
            ))
            .await?;
        Ok(into_artist_refs(response.items))
    }

    async fn similar_artists(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<ArtistRef>, CatalogError> {
        let response: ArtistsResponse = self
            .get_json(&format!(
                "/artists/similar?name={}&limit={}",
                urlencoding::encode(name),
                limit
            ))
            .await?;
        Ok(into_artist_refs(response.artists))
    }

    async fn top_tracks_for(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, CatalogError> {
        let response: TracksResponse = self
            .get_json(&format!(
                "/artists/top-tracks?name={}&limit={}",
                urlencoding::encode(artist_name),
                limit
            ))
            .await?;
        let mut tracks = into_candidates(response.tracks);
        tracks.truncate(limit);
        Ok(tracks)
    }
}
