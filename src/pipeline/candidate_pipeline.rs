//! Candidate generation.
//!
//! Seeds are resolved and expanded through the catalog as independent
//! branches run concurrently; a failing or slow branch is dropped without
//! affecting the others. The merged raw list then goes through a pure tail
//! (dedup, exclusion, quality gate, shuffle, truncate).

use futures::future::{join_all, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::quality::QualityPolicy;
use super::seeds::{Seed, SeedSet};
use super::PipelineError;
use crate::catalog_client::{CandidateTrack, CatalogClient, CatalogError};
use crate::server::metrics;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Timeout applied to every single catalog call.
    pub call_timeout: Duration,
    /// Overall budget of one `generate` or `discover` call.
    pub generate_budget: Duration,
    /// Raw results requested per wanted candidate.
    pub oversample_factor: usize,
    pub expand_similar_artists: bool,
    pub similar_artists_per_seed: usize,
    pub top_tracks_per_similar_artist: usize,
    /// How many of the listener's top artists are used when no seed survives
    /// resolution, and as the base of the discovery feed.
    pub fallback_top_artists: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            generate_budget: Duration::from_secs(10),
            oversample_factor: 2,
            expand_similar_artists: false,
            similar_artists_per_seed: 5,
            top_tracks_per_similar_artist: 5,
            fallback_top_artists: 5,
        }
    }
}

/// A resolved seed, ready to be turned into a catalog query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum QueryTerm {
    Artist(String),
    Genre(String),
}

impl QueryTerm {
    fn to_query(&self) -> String {
        match self {
            QueryTerm::Artist(name) => format!("artist:\"{}\"", name),
            QueryTerm::Genre(name) => format!("genre:\"{}\"", name),
        }
    }
}

pub struct CandidatePipeline {
    catalog: Arc<dyn CatalogClient>,
    settings: PipelineSettings,
}

impl CandidatePipeline {
    pub fn new(catalog: Arc<dyn CatalogClient>, settings: PipelineSettings) -> Self {
        Self { catalog, settings }
    }

    /// Turns seeds into at most `count` shuffled candidates.
    ///
    /// Only an out of range seed count is an error. Upstream failures shrink
    /// the result, possibly down to an empty list.
    pub async fn generate(
        &self,
        seeds: Vec<Seed>,
        listener_id: Option<&str>,
        exclusion: &HashSet<String>,
        count: usize,
        policy: QualityPolicy,
    ) -> Result<Vec<CandidateTrack>, PipelineError> {
        let seeds = SeedSet::try_from(seeds)?;
        let started = Instant::now();
        if count == 0 {
            return Ok(Vec::new());
        }
        let deadline = started + self.settings.generate_budget;

        let mut terms = self.resolve_terms(&seeds, deadline).await;
        if terms.is_empty() {
            terms = match listener_id {
                Some(listener_id) => self.top_artist_terms(listener_id, deadline).await,
                None => Vec::new(),
            };
        }
        if terms.is_empty() {
            info!("No usable seed terms, returning no candidates");
            metrics::record_pipeline_run("generate", 0, started.elapsed());
            return Ok(Vec::new());
        }

        let raw_target = count.saturating_mul(self.settings.oversample_factor.max(1));
        let per_term = raw_target.div_ceil(terms.len());
        debug!(
            "Expanding {} terms, {} raw results each",
            terms.len(),
            per_term
        );

        let mut branches: Vec<BoxFuture<'_, Vec<CandidateTrack>>> = Vec::new();
        for term in &terms {
            let query = term.to_query();
            branches.push(
                async move {
                    self.call("search", self.catalog.search(&query, per_term))
                        .await
                        .unwrap_or_default()
                }
                .boxed(),
            );
            if let (true, QueryTerm::Artist(name)) = (self.settings.expand_similar_artists, term) {
                branches.push(self.similar_artist_tracks(name.clone(), per_term).boxed());
            }
        }

        let (gathered, timed_out) = gather_until(deadline, branches).await;
        if timed_out {
            warn!("Candidate generation budget exceeded, using partial results");
            metrics::record_pipeline_budget_exceeded("generate");
        }
        let raw: Vec<CandidateTrack> = gathered.into_iter().flatten().flatten().collect();

        let candidates = finalize(raw, exclusion, count, &policy, &mut rand::rng());
        metrics::record_pipeline_run("generate", candidates.len(), started.elapsed());
        Ok(candidates)
    }

    /// Discovery feed built from the listener's own history: their top
    /// artists, expanded through similar artists and those artists' top
    /// tracks. An unavailable history yields an empty list.
    pub async fn discover(
        &self,
        listener_id: &str,
        exclusion: &HashSet<String>,
        count: usize,
        policy: QualityPolicy,
    ) -> Vec<CandidateTrack> {
        let started = Instant::now();
        if count == 0 {
            return Vec::new();
        }
        let deadline = started + self.settings.generate_budget;

        let top_artists: Vec<String> = self
            .top_artist_terms(listener_id, deadline)
            .await
            .into_iter()
            .filter_map(|term| match term {
                QueryTerm::Artist(name) => Some(name),
                QueryTerm::Genre(_) => None,
            })
            .collect();
        if top_artists.is_empty() {
            info!("No listening history for {}, discovery feed is empty", listener_id);
            metrics::record_pipeline_run("discover", 0, started.elapsed());
            return Vec::new();
        }

        let lookups: Vec<BoxFuture<'_, Vec<String>>> = top_artists
            .iter()
            .map(|name| {
                async move {
                    self.call(
                        "similar_artists",
                        self.catalog
                            .similar_artists(name, self.settings.similar_artists_per_seed),
                    )
                    .await
                    .unwrap_or_default()
                    .into_iter()
                    .map(|artist| artist.name)
                    .collect::<Vec<String>>()
                }
                .boxed()
            })
            .collect();
        let (similar, mut timed_out) = gather_until(deadline, lookups).await;

        let known: HashSet<String> = top_artists.iter().map(|n| n.to_lowercase()).collect();
        let mut seen = HashSet::new();
        let mut targets: Vec<String> = similar
            .into_iter()
            .flatten()
            .flatten()
            .filter(|name| !known.contains(&name.to_lowercase()))
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect();
        if targets.is_empty() {
            debug!("No similar artists found, expanding the top artists themselves");
            targets = top_artists;
        }

        let raw_target = count.saturating_mul(self.settings.oversample_factor.max(1));
        let per_artist = raw_target.div_ceil(targets.len());
        let branches: Vec<BoxFuture<'_, Vec<CandidateTrack>>> = targets
            .iter()
            .map(|name| {
                async move {
                    self.call("top_tracks_for", self.catalog.top_tracks_for(name, per_artist))
                        .await
                        .unwrap_or_default()
                }
                .boxed()
            })
            .collect();
        let (gathered, branches_timed_out) = gather_until(deadline, branches).await;
        timed_out |= branches_timed_out;
        if timed_out {
            warn!("Discovery budget exceeded, using partial results");
            metrics::record_pipeline_budget_exceeded("discover");
        }
        let raw: Vec<CandidateTrack> = gathered.into_iter().flatten().flatten().collect();

        let candidates = finalize(raw, exclusion, count, &policy, &mut rand::rng());
        metrics::record_pipeline_run("discover", candidates.len(), started.elapsed());
        candidates
    }

    /// Resolves seeds to query terms, in seed order. Seeds whose resolution
    /// fails are dropped.
    async fn resolve_terms(&self, seeds: &SeedSet, deadline: Instant) -> Vec<QueryTerm> {
        let lookups: Vec<BoxFuture<'_, Option<QueryTerm>>> = seeds
            .seeds()
            .iter()
            .map(|seed| {
                async move {
                    match seed {
                        Seed::Genre(genre) => Some(QueryTerm::Genre(genre.clone())),
                        _ => {
                            let name = self
                                .call("resolve_seed", self.catalog.resolve_seed(seed))
                                .await?;
                            if name.trim().is_empty() {
                                warn!("Seed {} resolved to an empty name, dropping it", seed);
                                return None;
                            }
                            Some(QueryTerm::Artist(name))
                        }
                    }
                }
                .boxed()
            })
            .collect();

        let (resolved, timed_out) = gather_until(deadline, lookups).await;
        if timed_out {
            warn!("Budget exceeded while resolving seeds");
        }

        let mut seen = HashSet::new();
        resolved
            .into_iter()
            .flatten()
            .flatten()
            .filter(|term| seen.insert(term.clone()))
            .collect()
    }

    async fn top_artist_terms(&self, listener_id: &str, deadline: Instant) -> Vec<QueryTerm> {
        let lookup = self.call(
            "top_artists_for",
            self.catalog
                .top_artists_for(listener_id, self.settings.fallback_top_artists),
        );
        match tokio::time::timeout_at(deadline, lookup).await {
            Ok(Some(artists)) => artists
                .into_iter()
                .map(|artist| QueryTerm::Artist(artist.name))
                .collect(),
            Ok(None) => Vec::new(),
            Err(_) => {
                warn!("Budget exceeded while fetching top artists of {}", listener_id);
                Vec::new()
            }
        }
    }

    async fn similar_artist_tracks(&self, name: String, limit: usize) -> Vec<CandidateTrack> {
        let Some(similar) = self
            .call(
                "similar_artists",
                self.catalog
                    .similar_artists(&name, self.settings.similar_artists_per_seed),
            )
            .await
        else {
            return Vec::new();
        };

        let per_artist = self.settings.top_tracks_per_similar_artist;
        let lookups = similar.iter().map(|artist| {
            self.call(
                "top_tracks_for",
                self.catalog.top_tracks_for(&artist.name, per_artist),
            )
        });
        let mut tracks: Vec<CandidateTrack> = join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .flatten()
            .collect();
        tracks.truncate(limit);
        tracks
    }

    /// Runs one catalog call under the per-call timeout, which starts once
    /// the catalog grants a request slot. Failures are logged and absorbed.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, CatalogError>>,
    {
        self.catalog.wait_for_slot().await;
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(self.settings.call_timeout, fut)
            .await
            .unwrap_or(Err(CatalogError::Timeout));
        match result {
            Ok(value) => {
                metrics::record_catalog_call(operation, "ok", started.elapsed());
                Some(value)
            }
            Err(err) => {
                warn!("Catalog {} failed: {}", operation, err);
                metrics::record_catalog_call(operation, err.kind(), started.elapsed());
                None
            }
        }
    }
}

/// Polls all branches until they finish or the deadline passes.
///
/// Results come back indexed by branch position, `None` for branches that
/// did not finish in time. The flag reports whether the deadline was hit.
async fn gather_until<T>(
    deadline: Instant,
    branches: Vec<BoxFuture<'_, T>>,
) -> (Vec<Option<T>>, bool) {
    let mut slots: Vec<Option<T>> = branches.iter().map(|_| None).collect();
    let mut pending: FuturesUnordered<_> = branches
        .into_iter()
        .enumerate()
        .map(|(idx, branch)| branch.map(move |value| (idx, value)))
        .collect();

    loop {
        match tokio::time::timeout_at(deadline, pending.next()).await {
            Ok(Some((idx, value))) => slots[idx] = Some(value),
            Ok(None) => return (slots, false),
            Err(_) => return (slots, true),
        }
    }
}

/// Dedup by normalized key (first occurrence wins), drop excluded keys, apply
/// the quality gate, shuffle, and keep the first `count`.
pub fn finalize<R: Rng + ?Sized>(
    raw: Vec<CandidateTrack>,
    exclusion: &HashSet<String>,
    count: usize,
    policy: &QualityPolicy,
    rng: &mut R,
) -> Vec<CandidateTrack> {
    let mut seen = HashSet::new();
    let mut survivors: Vec<CandidateTrack> = raw
        .into_iter()
        .map(|track| (track.normalized_key(), track))
        .filter(|(key, _)| seen.insert(key.clone()))
        .filter(|(key, _)| !exclusion.contains(key))
        .map(|(_, track)| track)
        .filter(|track| policy.passes(track))
        .collect();

    survivors.shuffle(rng);
    survivors.truncate(count);
    survivors
}
