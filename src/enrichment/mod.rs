//! Preview-audio and artwork enrichment.
//!
//! A primary [`TrackSearchProvider`] is tried first and, when it finds the
//! track, its metadata wins. Ranked [`EnrichmentProvider`]s then only fill
//! whatever is still missing.

mod cascade;
pub mod deezer;
pub mod itunes;

use crate::error::ProviderError;
use async_trait::async_trait;

pub use cascade::{Enricher, EnrichmentSettings};
pub use deezer::DeezerClient;
pub use itunes::ItunesClient;

/// Metadata a provider can attach to a track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentData {
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub album: Option<String>,
    pub canonical_id: Option<String>,
    pub uri: Option<String>,
}

impl EnrichmentData {
    pub fn is_empty(&self) -> bool {
        self.preview_url.is_none()
            && self.image_url.is_none()
            && self.album.is_none()
            && self.canonical_id.is_none()
            && self.uri.is_none()
    }
}

/// A catalog hit returned by the primary search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMatch {
    pub name: String,
    pub artist: String,
    pub data: EnrichmentData,
}

/// Search-capable provider used as the first enrichment source.
#[async_trait]
pub trait TrackSearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Structured search constrained to a title and an artist.
    async fn search_track(
        &self,
        name: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackMatch>, ProviderError>;

    /// Unstructured search over any text.
    async fn search_free_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TrackMatch>, ProviderError>;
}

/// Lookup-only provider used to fill gaps left by the primary source.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(
        &self,
        name: &str,
        artist: &str,
    ) -> Result<Option<EnrichmentData>, ProviderError>;
}
