//! Music catalog abstraction used by validation and similarity traversal.
//!
//! The pipelines only see the canonical shapes defined here. Provider
//! adapters (see [`lastfm`]) are responsible for flattening whatever their
//! upstream API returns into these types.

pub mod lastfm;

use crate::error::ProviderError;
use async_trait::async_trait;

pub use lastfm::LastFmClient;

/// A track as returned by catalog search or graph queries.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTrack {
    pub name: String,
    pub artist: String,
    /// Listener count; 0 when the provider does not report it.
    pub listeners: u64,
    pub image_url: Option<String>,
}

impl CatalogTrack {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            listeners: 0,
            image_url: None,
        }
    }
}

/// An artist related to a seed artist.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarArtist {
    pub name: String,
    /// Provider similarity in `0.0..=1.0`; higher is closer.
    pub match_score: f64,
}

/// A track from an artist's popularity ranking. The artist is implied by
/// the query.
#[derive(Debug, Clone, PartialEq)]
pub struct TopTrack {
    pub name: String,
    pub image_url: Option<String>,
}

/// Search-capable catalog with similarity-graph queries.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Free-text track search.
    async fn search_text(&self, query: &str, limit: usize)
        -> Result<Vec<CatalogTrack>, ProviderError>;

    async fn similar_artists(
        &self,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<SimilarArtist>, ProviderError>;

    async fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, ProviderError>;

    /// One page of an artist's top tracks; pages start at 1.
    async fn top_tracks_by_artist(
        &self,
        artist: &str,
        limit: usize,
        page: u32,
    ) -> Result<Vec<TopTrack>, ProviderError>;

    /// One page of the top tracks carrying a tag; pages start at 1.
    async fn top_tracks_by_tag(
        &self,
        tag: &str,
        limit: usize,
        page: u32,
    ) -> Result<Vec<CatalogTrack>, ProviderError>;
}
