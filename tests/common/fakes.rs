//! Scriptable in-memory providers
//!
//! Every fake records the calls it receives so tests can assert on what the
//! pipelines asked for (pages, attempts, hints), not only on what came back.
#![allow(dead_code)]

use async_trait::async_trait;
use discovery_server::catalog::{CatalogClient, CatalogTrack, SimilarArtist, TopTrack};
use discovery_server::enrichment::{
    EnrichmentData, EnrichmentProvider, EnrichmentSettings, Enricher, TrackMatch,
    TrackSearchProvider,
};
use discovery_server::recommend::{
    Candidate, GenerativeSuggester, RandomSource, RecommendationOrchestrator,
    RecommendationSettings, ScriptedRandom, SessionScope, SuggestionRequest,
};
use discovery_server::ProviderError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    SearchText { query: String, limit: usize },
    SimilarArtists { artist: String },
    SimilarTracks { track: String, artist: String },
    TopTracksByArtist { artist: String, page: u32 },
    TopTracksByTag { tag: String, page: u32 },
}

/// In-memory catalog.
///
/// Text search first looks for a registered query, then for known tracks
/// whose `"<name> <artist>"` equals the query (case-insensitive), which is
/// what the validator sends.
#[derive(Default)]
pub struct FakeCatalog {
    searches: HashMap<String, Vec<CatalogTrack>>,
    known_tracks: Vec<CatalogTrack>,
    similar_artists: HashMap<String, Vec<SimilarArtist>>,
    similar_tracks: HashMap<(String, String), Vec<CatalogTrack>>,
    artist_top_tracks: HashMap<String, Vec<TopTrack>>,
    tag_tracks: HashMap<String, Vec<CatalogTrack>>,
    fail_similar_tracks: bool,
    fail_everything: bool,
    similar_artists_delay: Duration,
    calls: Mutex<Vec<CatalogCall>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track findable by the validator.
    pub fn with_track(mut self, name: &str, artist: &str) -> Self {
        self.known_tracks.push(CatalogTrack::new(name, artist));
        self
    }

    pub fn with_search(mut self, query: &str, results: Vec<CatalogTrack>) -> Self {
        self.searches.insert(query.to_lowercase(), results);
        self
    }

    pub fn with_similar_artists(mut self, artist: &str, similar: &[&str]) -> Self {
        let similar = similar
            .iter()
            .enumerate()
            .map(|(i, name)| SimilarArtist {
                name: name.to_string(),
                match_score: 1.0 - i as f64 / 100.0,
            })
            .collect();
        self.similar_artists.insert(artist.to_lowercase(), similar);
        self
    }

    pub fn with_similar_tracks(mut self, track: &str, artist: &str, tracks: Vec<CatalogTrack>) -> Self {
        self.similar_tracks
            .insert((track.to_lowercase(), artist.to_lowercase()), tracks);
        self
    }

    /// Top tracks of `artist`; the same list is served for every page.
    pub fn with_top_tracks(mut self, artist: &str, names: &[&str]) -> Self {
        let tracks = names
            .iter()
            .map(|name| TopTrack {
                name: name.to_string(),
                image_url: None,
            })
            .collect();
        self.artist_top_tracks.insert(artist.to_lowercase(), tracks);
        self
    }

    /// Give `artist` a generated top-tracks list of `count` titles.
    pub fn with_generated_top_tracks(self, artist: &str, count: usize) -> Self {
        let names: Vec<String> = (1..=count).map(|i| format!("{} Song {}", artist, i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.with_top_tracks(artist, &names)
    }

    pub fn with_tag_tracks(mut self, tag: &str, tracks: Vec<CatalogTrack>) -> Self {
        self.tag_tracks.insert(tag.to_lowercase(), tracks);
        self
    }

    pub fn failing_similar_tracks(mut self) -> Self {
        self.fail_similar_tracks = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_everything = true;
        self
    }

    /// Make similar-artist lookups answer only after `delay`.
    pub fn with_slow_similar_artists(mut self, delay: Duration) -> Self {
        self.similar_artists_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Pages requested from artist top-tracks rankings, in call order.
    pub fn top_track_pages(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CatalogCall::TopTracksByArtist { artist, page } => Some((artist, page)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: CatalogCall) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_everything {
            Err(ProviderError::Connection("catalog offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search_text(&self, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, ProviderError> {
        self.record(CatalogCall::SearchText {
            query: query.to_string(),
            limit,
        })?;
        let key = query.to_lowercase();
        if let Some(results) = self.searches.get(&key) {
            return Ok(results.iter().take(limit).cloned().collect());
        }
        Ok(self
            .known_tracks
            .iter()
            .filter(|t| format!("{} {}", t.name, t.artist).to_lowercase() == key)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn similar_artists(&self, artist: &str, limit: usize) -> Result<Vec<SimilarArtist>, ProviderError> {
        self.record(CatalogCall::SimilarArtists {
            artist: artist.to_string(),
        })?;
        if !self.similar_artists_delay.is_zero() {
            tokio::time::sleep(self.similar_artists_delay).await;
        }
        Ok(self
            .similar_artists
            .get(&artist.to_lowercase())
            .map(|s| s.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, ProviderError> {
        self.record(CatalogCall::SimilarTracks {
            track: track.to_string(),
            artist: artist.to_string(),
        })?;
        if self.fail_similar_tracks {
            return Err(ProviderError::Api {
                status: 6,
                message: "Track not found".to_string(),
            });
        }
        Ok(self
            .similar_tracks
            .get(&(track.to_lowercase(), artist.to_lowercase()))
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn top_tracks_by_artist(
        &self,
        artist: &str,
        limit: usize,
        page: u32,
    ) -> Result<Vec<TopTrack>, ProviderError> {
        self.record(CatalogCall::TopTracksByArtist {
            artist: artist.to_string(),
            page,
        })?;
        Ok(self
            .artist_top_tracks
            .get(&artist.to_lowercase())
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn top_tracks_by_tag(
        &self,
        tag: &str,
        limit: usize,
        page: u32,
    ) -> Result<Vec<CatalogTrack>, ProviderError> {
        self.record(CatalogCall::TopTracksByTag {
            tag: tag.to_string(),
            page,
        })?;
        Ok(self
            .tag_tracks
            .get(&tag.to_lowercase())
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// Generative suggester
// ============================================================================

/// One scripted reply of the suggester.
pub enum Reply {
    Candidates(Vec<Candidate>),
    Failure,
}

/// Suggester replaying scripted replies, then returning nothing.
#[derive(Default)]
pub struct FakeSuggester {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<SuggestionRequest>>,
    delay: Duration,
}

impl FakeSuggester {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Answer every request only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Suggester that never suggests anything.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<SuggestionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeSuggester for FakeSuggester {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Candidate>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Candidates(candidates)) => Ok(candidates),
            Some(Reply::Failure) => Err(ProviderError::InvalidResponse(
                "Model output is not JSON".to_string(),
            )),
            None => Ok(Vec::new()),
        }
    }
}

/// Candidates `"<artist> Song i"` by `artist` for `i` in `range`.
pub fn candidates(artist: &str, range: std::ops::Range<usize>) -> Vec<Candidate> {
    range
        .map(|i| Candidate::new(&format!("{} Song {}", artist, i), artist))
        .collect()
}

/// Register every candidate as a real catalog track.
pub fn with_known(mut catalog: FakeCatalog, candidates: &[Candidate]) -> FakeCatalog {
    for candidate in candidates {
        if let (Some(name), Some(artist)) = (&candidate.name, &candidate.artist) {
            catalog = catalog.with_track(name, artist);
        }
    }
    catalog
}

// ============================================================================
// Enrichment
// ============================================================================

/// Primary search provider knowing a fixed set of tracks.
#[derive(Default)]
pub struct FakeTrackSearch {
    tracks: Vec<TrackMatch>,
}

impl FakeTrackSearch {
    pub fn with_match(mut self, name: &str, artist: &str, id: &str) -> Self {
        self.tracks.push(TrackMatch {
            name: name.to_string(),
            artist: artist.to_string(),
            data: EnrichmentData {
                preview_url: Some(format!("https://previews.test/{}.mp3", id)),
                image_url: Some(format!("https://covers.test/{}.jpg", id)),
                album: Some(format!("Album of {}", name)),
                canonical_id: Some(id.to_string()),
                uri: Some(format!("https://tracks.test/{}", id)),
            },
        });
        self
    }
}

#[async_trait]
impl TrackSearchProvider for FakeTrackSearch {
    fn name(&self) -> &str {
        "fake-search"
    }

    async fn search_track(
        &self,
        name: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackMatch>, ProviderError> {
        Ok(self
            .tracks
            .iter()
            .filter(|t| t.name.eq_ignore_ascii_case(name) && t.artist.eq_ignore_ascii_case(artist))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn search_free_text(&self, _query: &str, _limit: usize) -> Result<Vec<TrackMatch>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Gap-filling provider that always fails.
pub struct BrokenLookup;

#[async_trait]
impl EnrichmentProvider for BrokenLookup {
    fn name(&self) -> &str {
        "broken"
    }

    async fn lookup(&self, _name: &str, _artist: &str) -> Result<Option<EnrichmentData>, ProviderError> {
        Err(ProviderError::RateLimited)
    }
}

// ============================================================================
// Orchestrator builders
// ============================================================================

pub fn fast_enrichment() -> EnrichmentSettings {
    EnrichmentSettings {
        batch_size: 5,
        batch_delay: Duration::ZERO,
        provider_timeout: Duration::from_secs(2),
    }
}

pub fn test_settings(scope: SessionScope) -> RecommendationSettings {
    RecommendationSettings {
        provider_timeout: Duration::from_secs(2),
        pipeline_deadline: Duration::from_secs(20),
        session_scope: scope,
        ..Default::default()
    }
}

/// Orchestrator over `catalog` with deterministic randomness, no model and
/// no enrichment.
pub fn orchestrator(catalog: Arc<FakeCatalog>) -> RecommendationOrchestrator {
    RecommendationOrchestrator::new(
        catalog,
        Enricher::disabled(),
        test_settings(SessionScope::Instance),
    )
    .with_random(Arc::new(ScriptedRandom::highest()) as Arc<dyn RandomSource>)
}

pub fn orchestrator_with_model(
    catalog: Arc<FakeCatalog>,
    suggester: Arc<FakeSuggester>,
) -> RecommendationOrchestrator {
    orchestrator(catalog).with_suggester(suggester)
}
