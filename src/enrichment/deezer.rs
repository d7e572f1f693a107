//! Deezer public search API, the primary enrichment source.
//!
//! No API key is required. Deezer reports quota errors inside a 200 response
//! (`{"error": {"code": 4, ...}}`), so the body is inspected before parsing.

use super::{EnrichmentData, TrackMatch, TrackSearchProvider};
use crate::error::{check_status, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEEZER_API_BASE: &str = "https://api.deezer.com";
const QUOTA_EXCEEDED_CODE: u64 = 4;

pub struct DeezerClient {
    client: Client,
    base_url: String,
}

impl DeezerClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(DEEZER_API_BASE, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackMatch>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        debug!(query, "Searching Deezer");

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: serde_json::Value = response.json().await?;

        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(|c| c.as_u64()).unwrap_or(0);
            if code == QUOTA_EXCEEDED_CODE {
                return Err(ProviderError::RateLimited);
            }
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(ProviderError::Api {
                status: code as u16,
                message,
            });
        }

        let body: DeezerSearchResponse = serde_json::from_value(body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Deezer search: {}", e))
        })?;

        Ok(body
            .data
            .into_iter()
            .filter_map(DeezerTrack::into_match)
            .take(limit)
            .collect())
    }
}

/// Build Deezer's advanced-search query, escaping embedded quotes.
fn structured_query(name: &str, artist: &str) -> String {
    format!(
        "track:\"{}\" artist:\"{}\"",
        name.replace('"', " "),
        artist.replace('"', " ")
    )
}

#[async_trait]
impl TrackSearchProvider for DeezerClient {
    fn name(&self) -> &str {
        "deezer"
    }

    async fn search_track(
        &self,
        name: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackMatch>, ProviderError> {
        self.search(&structured_query(name, artist), limit).await
    }

    async fn search_free_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TrackMatch>, ProviderError> {
        self.search(query, limit).await
    }
}

#[derive(Debug, Deserialize)]
struct DeezerSearchResponse {
    #[serde(default)]
    data: Vec<DeezerTrack>,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    id: Option<u64>,
    title: Option<String>,
    link: Option<String>,
    preview: Option<String>,
    artist: Option<DeezerArtist>,
    album: Option<DeezerAlbum>,
}

#[derive(Debug, Deserialize)]
struct DeezerArtist {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerAlbum {
    title: Option<String>,
    cover_xl: Option<String>,
    cover_big: Option<String>,
    cover_medium: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl DeezerTrack {
    fn into_match(self) -> Option<TrackMatch> {
        let name = non_empty(self.title)?;
        let artist = non_empty(self.artist.and_then(|a| a.name))?;

        let (album, image_url) = match self.album {
            Some(album) => (
                non_empty(album.title),
                non_empty(album.cover_xl)
                    .or_else(|| non_empty(album.cover_big))
                    .or_else(|| non_empty(album.cover_medium)),
            ),
            None => (None, None),
        };

        Some(TrackMatch {
            name,
            artist,
            data: EnrichmentData {
                preview_url: non_empty(self.preview),
                image_url,
                album,
                canonical_id: self.id.map(|id| format!("deezer:{}", id)),
                uri: non_empty(self.link),
            },
        })
    }
}
