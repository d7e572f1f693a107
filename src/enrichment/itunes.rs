//! iTunes Search API, the secondary enrichment source.

use super::{EnrichmentData, EnrichmentProvider};
use crate::error::{check_status, ProviderError};
use crate::text::normalize;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ITUNES_API_BASE: &str = "https://itunes.apple.com";
const SEARCH_LIMIT: usize = 5;

pub struct ItunesClient {
    client: Client,
    base_url: String,
    country: String,
}

impl ItunesClient {
    pub fn new(country: &str, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(ITUNES_API_BASE, country, timeout)
    }

    pub fn with_base_url(base_url: &str, country: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            country: country.to_string(),
        })
    }
}

/// Artwork URLs come as 100x100 thumbnails; the CDN serves any size.
fn upsize_artwork(url: &str) -> String {
    url.replace("100x100bb", "600x600bb")
}

fn artists_overlap(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

#[async_trait]
impl EnrichmentProvider for ItunesClient {
    fn name(&self) -> &str {
        "itunes"
    }

    async fn lookup(
        &self,
        name: &str,
        artist: &str,
    ) -> Result<Option<EnrichmentData>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let term = format!("{} {}", artist, name);
        debug!(term = %term, "Searching iTunes");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("term", term),
                ("entity", "song".to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
                ("country", self.country.clone()),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;
        // iTunes answers with text/javascript, so decode from text
        let text = response.text().await?;
        let body: ItunesSearchResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse iTunes search: {}", e))
        })?;

        Ok(body
            .results
            .into_iter()
            .find(|r| {
                r.artist_name
                    .as_deref()
                    .is_some_and(|a| artists_overlap(a, artist))
            })
            .map(ItunesResult::into_data)
            .filter(|data| !data.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct ItunesSearchResponse {
    #[serde(default)]
    results: Vec<ItunesResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesResult {
    track_id: Option<u64>,
    artist_name: Option<String>,
    collection_name: Option<String>,
    preview_url: Option<String>,
    artwork_url100: Option<String>,
    track_view_url: Option<String>,
}

impl ItunesResult {
    fn into_data(self) -> EnrichmentData {
        EnrichmentData {
            preview_url: self.preview_url.filter(|u| !u.is_empty()),
            image_url: self
                .artwork_url100
                .filter(|u| !u.is_empty())
                .map(|u| upsize_artwork(&u)),
            album: self.collection_name.filter(|c| !c.is_empty()),
            canonical_id: self.track_id.map(|id| format!("itunes:{}", id)),
            uri: self.track_view_url.filter(|u| !u.is_empty()),
        }
    }
}
