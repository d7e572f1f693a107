//! Verifies that a generated (name, artist) pair is a real catalog track.

use crate::catalog::{CatalogClient, CatalogTrack};
use crate::text::{normalize, similarity};
use crate::timing::call_provider;
use std::sync::Arc;
use std::time::Duration;

const VALIDATION_SEARCH_LIMIT: usize = 5;
const ARTIST_SIMILARITY_THRESHOLD: f64 = 0.7;
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.6;

pub struct TrackValidator {
    catalog: Arc<dyn CatalogClient>,
    timeout: Duration,
}

impl TrackValidator {
    pub fn new(catalog: Arc<dyn CatalogClient>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    /// Look the pair up in the catalog and return the canonical track, or
    /// `None` when nothing matches closely enough or the catalog fails.
    pub async fn validate(&self, name: &str, artist: &str) -> Option<CatalogTrack> {
        let query = format!("{} {}", name, artist);
        let results = call_provider(
            "catalog",
            "search_text",
            self.timeout,
            self.catalog.search_text(&query, VALIDATION_SEARCH_LIMIT),
        )
        .await?;

        results
            .into_iter()
            .find(|result| is_match(result, name, artist))
    }
}

fn close_enough(found: &str, wanted: &str, threshold: f64) -> bool {
    if found.is_empty() || wanted.is_empty() {
        return false;
    }
    found.contains(wanted) || wanted.contains(found) || similarity(found, wanted) > threshold
}

/// Both the artist and the title must overlap or be close by bigram
/// similarity. The artist threshold is stricter than the title one.
pub(crate) fn is_match(result: &CatalogTrack, name: &str, artist: &str) -> bool {
    close_enough(
        &normalize(&result.artist),
        &normalize(artist),
        ARTIST_SIMILARITY_THRESHOLD,
    ) && close_enough(
        &normalize(&result.name),
        &normalize(name),
        TITLE_SIMILARITY_THRESHOLD,
    )
}
