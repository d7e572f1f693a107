//! Similarity-graph traversal, the pipeline that needs no generative model.
//!
//! Artist and track modes sample deep pages of popularity rankings so that
//! repeated calls surface different tracks instead of the same chart-toppers.

use super::error::RecommendError;
use super::filters::{apply_diversity_filter, deduplicate_tracks};
use super::intent::{classify_offline, Intent, TRACK_SEARCH_LISTENER_THRESHOLD};
use super::models::{clamp_limit, validate_prompt, SimilarityRequest, Track};
use super::orchestrator::RecommendationOrchestrator;
use super::random::{range_inclusive, shuffle};
use super::session::SessionDedupState;
use crate::catalog::{CatalogTrack, SimilarArtist};
use crate::text::normalize;
use crate::timing::{call_provider, with_timeout, Deadline};
use futures::future::join_all;
use tracing::{debug, info, warn};

const SIMILAR_POOL_SIZE: usize = 60;
const SELECTED_ARTISTS: usize = 20;
const TOP_TRACKS_PAGE_SIZE: usize = 10;
const TRACKS_PER_ARTIST: usize = 3;
const ARTIST_PAGE_RANGE: (u32, u32) = (2, 10);

const DEEP_CUT_ARTISTS: usize = 8;
const DEEP_CUT_PAGE_RANGE: (u32, u32) = (10, 25);
const DEEP_CUTS_PER_ARTIST: usize = 5;
const DEEP_CUT_MULTIPLIER: usize = 3;

const GENRE_FETCH_SIZE: usize = 100;
const GENRE_PAGE_RANGE: (u32, u32) = (1, 5);
const TRACK_SEARCH_LIMIT: usize = 5;

/// Tracks by the seed artist (or a collaboration naming it) are excluded.
fn is_seed_artist(artist: &str, seed: &str) -> bool {
    let artist = normalize(artist);
    !seed.is_empty() && (artist == seed || artist.contains(seed))
}

/// Similar artists closest first, minus the seed. Ties keep provider order.
fn rank_similar(mut similar: Vec<SimilarArtist>, seed: &str) -> Vec<String> {
    similar.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    similar
        .into_iter()
        .map(|a| a.name)
        .filter(|name| !is_seed_artist(name, seed))
        .collect()
}

/// Per-call traversal state.
struct Traversal<'a> {
    limit: usize,
    session: &'a SessionDedupState,
    /// No top-track page is fetched once this has passed.
    deadline: Deadline,
}

impl<'a> Traversal<'a> {
    fn keep(&self, track: &Track, seed: &str) -> bool {
        !is_seed_artist(&track.artist, seed) && !self.session.contains(&track.name, &track.artist)
    }
}

impl RecommendationOrchestrator {
    /// Recommend tracks by walking the catalog's similarity graph from the
    /// artist, track or genre named in the prompt.
    pub async fn generate_from_similarity_graph(
        &self,
        request: &SimilarityRequest,
    ) -> Result<Vec<Track>, RecommendError> {
        let prompt = validate_prompt(&request.prompt)?;
        let limit = clamp_limit(request.limit);
        let deadline = self.deadline();
        let session = self.session_for_call();
        let traversal = Traversal {
            limit,
            session: session.as_ref(),
            deadline,
        };

        let intent = self.detect_intent(&prompt).await;
        info!(?intent, limit, "Similarity-graph recommendation");

        let tracks = match intent {
            Intent::Track { name, artist } => self.track_mode(&traversal, &name, &artist).await,
            Intent::TrackSearch(query) => self.track_search_mode(&traversal, &query).await,
            Intent::Genre(genre) => self.genre_mode(&traversal, &genre).await,
            Intent::Artist(artist) => self.artist_mode(&traversal, &artist).await,
        };

        session.record(tracks.iter().map(|t| (t.name.as_str(), t.artist.as_str())));
        Ok(self.enricher.enrich(tracks, &deadline).await)
    }

    async fn detect_intent(&self, prompt: &str) -> Intent {
        if let Some(intent) = classify_offline(prompt) {
            return intent;
        }

        let top_hit = call_provider(
            "catalog",
            "search_text",
            self.settings.provider_timeout,
            self.catalog.search_text(prompt, 1),
        )
        .await
        .and_then(|hits| hits.into_iter().next());

        match top_hit {
            Some(hit) if hit.listeners > TRACK_SEARCH_LISTENER_THRESHOLD => {
                Intent::TrackSearch(prompt.to_string())
            }
            _ => Intent::Artist(prompt.to_string()),
        }
    }

    async fn track_search_mode(&self, traversal: &Traversal<'_>, query: &str) -> Vec<Track> {
        let first_hit = call_provider(
            "catalog",
            "search_text",
            self.settings.provider_timeout,
            self.catalog.search_text(query, TRACK_SEARCH_LIMIT),
        )
        .await
        .and_then(|hits| hits.into_iter().next());

        match first_hit {
            Some(hit) => self.track_mode(traversal, &hit.name, &hit.artist).await,
            None => self.artist_mode(traversal, query).await,
        }
    }

    async fn track_mode(&self, traversal: &Traversal<'_>, name: &str, artist: &str) -> Vec<Track> {
        let similar = with_timeout(
            self.settings.provider_timeout,
            self.catalog.similar_tracks(name, artist, SIMILAR_POOL_SIZE),
        )
        .await;
        let similar = match similar {
            Ok(similar) => similar,
            Err(e) => {
                warn!(track = name, artist, error = %e, "Similar tracks failed, falling back to artist");
                return self.artist_mode(traversal, artist).await;
            }
        };

        let seed = normalize(artist);
        let primary: Vec<Track> = similar
            .into_iter()
            .map(catalog_track)
            .filter(|t| traversal.keep(t, &seed))
            .collect();

        // The artist pool only feeds the backfill
        let pool = if primary.len() < traversal.limit && !traversal.deadline.expired() {
            self.similar_artist_pool(artist).await
        } else {
            Vec::new()
        };
        self.finish_traversal(traversal, &seed, &pool, primary).await
    }

    async fn artist_mode(&self, traversal: &Traversal<'_>, artist: &str) -> Vec<Track> {
        let seed = normalize(artist);
        let pool = self.similar_artist_pool(artist).await;

        let mut selected = pool.clone();
        shuffle(self.random.as_ref(), &mut selected);
        selected.truncate(SELECTED_ARTISTS);

        let primary = self
            .sample_top_tracks(traversal, &selected, ARTIST_PAGE_RANGE, TRACKS_PER_ARTIST)
            .await
            .into_iter()
            .filter(|t| traversal.keep(t, &seed))
            .collect();

        self.finish_traversal(traversal, &seed, &pool, primary).await
    }

    async fn genre_mode(&self, traversal: &Traversal<'_>, genre: &str) -> Vec<Track> {
        let page = range_inclusive(self.random.as_ref(), GENRE_PAGE_RANGE.0, GENRE_PAGE_RANGE.1);
        let mut tracks: Vec<Track> = call_provider(
            "catalog",
            "top_tracks_by_tag",
            self.settings.provider_timeout,
            self.catalog.top_tracks_by_tag(genre, GENRE_FETCH_SIZE, page),
        )
        .await
        .unwrap_or_default()
        .into_iter()
        .map(catalog_track)
        .filter(|t| !traversal.session.contains(&t.name, &t.artist))
        .collect();

        shuffle(self.random.as_ref(), &mut tracks);
        tracks.truncate(traversal.limit);
        tracks
    }

    async fn similar_artist_pool(&self, artist: &str) -> Vec<String> {
        let similar = call_provider(
            "catalog",
            "similar_artists",
            self.settings.provider_timeout,
            self.catalog.similar_artists(artist, SIMILAR_POOL_SIZE),
        )
        .await
        .unwrap_or_default();
        rank_similar(similar, &normalize(artist))
    }

    /// Top up, deduplicate, cap per artist, shuffle and truncate.
    async fn finish_traversal(
        &self,
        traversal: &Traversal<'_>,
        seed: &str,
        pool: &[String],
        mut tracks: Vec<Track>,
    ) -> Vec<Track> {
        if tracks.len() < traversal.limit && traversal.deadline.expired() {
            info!(found = tracks.len(), "Deadline reached, skipping deep-cut backfill");
        } else if tracks.len() < traversal.limit {
            let wanted = (traversal.limit - tracks.len()) * DEEP_CUT_MULTIPLIER;
            let deep_cuts = self.deep_cuts(traversal, pool, wanted).await;
            let before = tracks.len();
            tracks.extend(deep_cuts.into_iter().filter(|t| traversal.keep(t, seed)));
            debug!(added = tracks.len() - before, wanted, "Backfilled with deep cuts");
        }

        let tracks = deduplicate_tracks(tracks);
        let mut tracks = apply_diversity_filter(tracks, self.settings.graph_max_per_artist);
        shuffle(self.random.as_ref(), &mut tracks);
        tracks.truncate(traversal.limit);
        tracks
    }

    async fn deep_cuts(&self, traversal: &Traversal<'_>, pool: &[String], wanted: usize) -> Vec<Track> {
        let mut artists: Vec<String> = pool.iter().take(DEEP_CUT_ARTISTS).cloned().collect();
        if artists.is_empty() || wanted == 0 {
            return Vec::new();
        }
        shuffle(self.random.as_ref(), &mut artists);

        let mut tracks = self
            .sample_top_tracks(traversal, &artists, DEEP_CUT_PAGE_RANGE, DEEP_CUTS_PER_ARTIST)
            .await;
        tracks.truncate(wanted);
        tracks
    }

    /// Fetch one random page of each artist's top tracks and keep a random
    /// `per_artist` of it. Pages are drawn up front so the draws follow the
    /// artist order.
    async fn sample_top_tracks(
        &self,
        traversal: &Traversal<'_>,
        artists: &[String],
        pages: (u32, u32),
        per_artist: usize,
    ) -> Vec<Track> {
        if traversal.deadline.expired() {
            debug!(artists = artists.len(), "Deadline reached, not sampling top tracks");
            return Vec::new();
        }

        let requests: Vec<(&String, u32)> = artists
            .iter()
            .map(|artist| (artist, range_inclusive(self.random.as_ref(), pages.0, pages.1)))
            .collect();

        let fetched = join_all(requests.into_iter().map(|(artist, page)| async move {
            let tracks = call_provider(
                "catalog",
                "top_tracks_by_artist",
                self.settings.provider_timeout,
                self.catalog.top_tracks_by_artist(artist, TOP_TRACKS_PAGE_SIZE, page),
            )
            .await
            .unwrap_or_default();
            (artist, tracks)
        }))
        .await;

        let mut sampled = Vec::new();
        for (artist, top_tracks) in fetched {
            let mut tracks: Vec<Track> = top_tracks
                .into_iter()
                .filter(|t| !t.name.trim().is_empty())
                .map(|t| Track::new(t.name, artist.as_str()).with_image(t.image_url))
                .collect();
            shuffle(self.random.as_ref(), &mut tracks);
            tracks.truncate(per_artist);
            sampled.extend(tracks);
        }
        sampled
    }
}

fn catalog_track(track: CatalogTrack) -> Track {
    Track::new(track.name, track.artist)
        .with_listeners(track.listeners)
        .with_image(track.image_url)
}
