//! Batched enrichment cascade.
//!
//! Tracks are processed in fixed-size batches; tracks inside a batch run
//! concurrently and batches run one after another with a pause in between,
//! which keeps the request rate against the free public APIs bounded.

use super::{EnrichmentData, EnrichmentProvider, TrackMatch, TrackSearchProvider};
use crate::recommend::Track;
use crate::text::{clean_track_name, normalize};
use crate::timing::{call_provider, Deadline};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const PRIMARY_SEARCH_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub provider_timeout: Duration,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_millis(100),
            provider_timeout: Duration::from_secs(8),
        }
    }
}

/// Fills preview audio, artwork and album metadata on recommended tracks.
pub struct Enricher {
    primary: Option<Arc<dyn TrackSearchProvider>>,
    fallbacks: Vec<Arc<dyn EnrichmentProvider>>,
    settings: EnrichmentSettings,
}

impl Enricher {
    pub fn new(settings: EnrichmentSettings) -> Self {
        Self {
            primary: None,
            fallbacks: Vec::new(),
            settings,
        }
    }

    /// An enricher that leaves every track untouched.
    pub fn disabled() -> Self {
        Self::new(EnrichmentSettings::default())
    }

    pub fn with_primary(mut self, provider: Arc<dyn TrackSearchProvider>) -> Self {
        self.primary = Some(provider);
        self
    }

    /// Append a gap-filling provider; earlier providers rank higher.
    pub fn with_fallback(mut self, provider: Arc<dyn EnrichmentProvider>) -> Self {
        self.fallbacks.push(provider);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.primary.is_some() || !self.fallbacks.is_empty()
    }

    /// Enrich every track, preserving order. Once the deadline passes the
    /// remaining batches are returned as they are.
    pub async fn enrich(&self, tracks: Vec<Track>, deadline: &Deadline) -> Vec<Track> {
        if !self.is_enabled() || tracks.is_empty() {
            return tracks;
        }

        let batch_size = self.settings.batch_size.max(1);
        let mut batches: Vec<Vec<Track>> = Vec::new();
        let mut iter = tracks.into_iter().peekable();
        while iter.peek().is_some() {
            batches.push(iter.by_ref().take(batch_size).collect());
        }

        let batch_count = batches.len();
        let mut enriched = Vec::new();
        for (index, batch) in batches.into_iter().enumerate() {
            if deadline.expired() {
                info!(
                    skipped_batches = batch_count - index,
                    "Deadline reached, returning remaining tracks unenriched"
                );
                enriched.extend(batch);
                continue;
            }

            enriched.extend(join_all(batch.into_iter().map(|t| self.enrich_track(t))).await);

            if index + 1 < batch_count && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }
        enriched
    }

    async fn enrich_track(&self, mut track: Track) -> Track {
        let cleaned = clean_track_name(&track.name);

        if let Some(primary) = &self.primary {
            if let Some(hit) = self.primary_match(primary.as_ref(), &track, &cleaned).await {
                debug!(track = %track.name, provider = primary.name(), "Primary match");
                apply_primary(&mut track, hit.data);
            }
        }

        for provider in &self.fallbacks {
            if track.has_preview() && track.has_artwork() {
                break;
            }
            let lookup = call_provider(
                provider.name(),
                "lookup",
                self.settings.provider_timeout,
                provider.lookup(&cleaned, &track.artist),
            )
            .await
            .flatten();
            if let Some(data) = lookup {
                fill_missing(&mut track, data);
            }
        }

        track
    }

    /// Exact match on the cleaned title, then on the raw title, then a fuzzy
    /// free-text search accepted only when the artists overlap.
    async fn primary_match(
        &self,
        provider: &dyn TrackSearchProvider,
        track: &Track,
        cleaned: &str,
    ) -> Option<TrackMatch> {
        if let Some(hit) = self.exact_match(provider, cleaned, &track.artist).await {
            return Some(hit);
        }
        if cleaned != track.name {
            if let Some(hit) = self.exact_match(provider, &track.name, &track.artist).await {
                return Some(hit);
            }
        }

        let query = format!("{} {}", track.artist, cleaned);
        let hits = call_provider(
            provider.name(),
            "search_free_text",
            self.settings.provider_timeout,
            provider.search_free_text(&query, PRIMARY_SEARCH_LIMIT),
        )
        .await?;
        hits.into_iter()
            .next()
            .filter(|hit| artists_cross_contain(&hit.artist, &track.artist))
    }

    async fn exact_match(
        &self,
        provider: &dyn TrackSearchProvider,
        name: &str,
        artist: &str,
    ) -> Option<TrackMatch> {
        let hits = call_provider(
            provider.name(),
            "search_track",
            self.settings.provider_timeout,
            provider.search_track(name, artist, PRIMARY_SEARCH_LIMIT),
        )
        .await?;

        let wanted_name = normalize(&clean_track_name(name));
        let wanted_artist = normalize(artist);
        hits.into_iter().find(|hit| {
            normalize(&clean_track_name(&hit.name)) == wanted_name
                && normalize(&hit.artist) == wanted_artist
        })
    }
}

fn artists_cross_contain(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

/// Primary-source metadata overrides the defaults.
fn apply_primary(track: &mut Track, data: EnrichmentData) {
    if let Some(preview) = data.preview_url {
        track.preview_url = Some(preview);
    }
    if let Some(image) = data.image_url {
        track.image_url = Some(image);
    }
    if let Some(album) = data.album {
        track.album = Some(album);
    }
    if let Some(id) = data.canonical_id {
        track.id = id;
    }
    if let Some(uri) = data.uri {
        track.external_url = Some(uri);
    }
}

/// Lower-ranked sources only fill gaps.
fn fill_missing(track: &mut Track, data: EnrichmentData) {
    if !track.has_preview() {
        if let Some(preview) = data.preview_url {
            track.preview_url = Some(preview);
        }
    }
    if !track.has_artwork() {
        if let Some(image) = data.image_url {
            track.image_url = Some(image);
        }
    }
    if track.album.is_none() {
        track.album = data.album;
    }
    if track.external_url.is_none() {
        track.external_url = data.uri;
    }
}
