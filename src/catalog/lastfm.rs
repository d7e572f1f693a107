//! Last.fm API client: text search, similarity graph and track info.
//!
//! Rate limited to 5 requests per second per Last.fm API guidelines.
//!
//! Last.fm responses are loosely typed (a single result is sometimes an
//! object instead of a one-element array, counts arrive as strings, artists
//! are sometimes a string and sometimes an object). Everything is flattened
//! into the canonical catalog types here.

use super::{CatalogClient, CatalogTrack, SimilarArtist, TopTrack};
use crate::enrichment::{EnrichmentData, EnrichmentProvider};
use crate::error::{check_status, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(200); // 5 req/sec

/// Image hash Last.fm serves when it has no artwork (grey star).
const PLACEHOLDER_IMAGE_HASH: &str = "2a96cbd8b46e442fc41c2b86b821562f";

pub struct LastFmClient {
    client: Client,
    base_url: String,
    api_key: String,
    last_request: Mutex<Instant>,
}

impl LastFmClient {
    pub fn new(api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(LASTFM_API_BASE, api_key, timeout)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            last_request: Mutex::new(Instant::now() - RATE_LIMIT_INTERVAL),
        })
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < RATE_LIMIT_INTERVAL {
            tokio::time::sleep(RATE_LIMIT_INTERVAL - elapsed).await;
        }
        *last = Instant::now();
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        self.rate_limit().await;

        let mut query: Vec<(&str, String)> = vec![
            ("method", method.to_string()),
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
        ];
        query.extend(params.iter().cloned());

        debug!(method, "Calling Last.fm");
        let response = self.client.get(&self.base_url).query(&query).send().await?;
        let response = check_status(response).await?;
        let body: serde_json::Value = response.json().await?;

        // Last.fm reports most errors with HTTP 200 and an error object
        if let Some(code) = body.get("error").and_then(|e| e.as_u64()) {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(if code == 29 {
                ProviderError::RateLimited
            } else {
                ProviderError::Api {
                    status: code as u16,
                    message,
                }
            });
        }

        serde_json::from_value(body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Last.fm {}: {}", method, e))
        })
    }
}

#[async_trait]
impl CatalogClient for LastFmClient {
    async fn search_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, ProviderError> {
        let body: TrackSearchResponse = self
            .call(
                "track.search",
                &[("track", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(body
            .results
            .and_then(|r| r.trackmatches)
            .map(|m| m.track.into_vec())
            .unwrap_or_default()
            .into_iter()
            .filter_map(LastFmTrack::into_catalog_track)
            .take(limit)
            .collect())
    }

    async fn similar_artists(
        &self,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<SimilarArtist>, ProviderError> {
        let body: SimilarArtistsResponse = self
            .call(
                "artist.getsimilar",
                &[
                    ("artist", artist.to_string()),
                    ("limit", limit.to_string()),
                    ("autocorrect", "1".to_string()),
                ],
            )
            .await?;

        Ok(body
            .similarartists
            .map(|sa| sa.artist.into_vec())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                let name = a.name.filter(|n| !n.trim().is_empty())?;
                Some(SimilarArtist {
                    name,
                    match_score: a.match_score.unwrap_or(0.0),
                })
            })
            .collect())
    }

    async fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, ProviderError> {
        let body: SimilarTracksResponse = self
            .call(
                "track.getsimilar",
                &[
                    ("track", track.to_string()),
                    ("artist", artist.to_string()),
                    ("limit", limit.to_string()),
                    ("autocorrect", "1".to_string()),
                ],
            )
            .await?;

        Ok(body
            .similartracks
            .map(|st| st.track.into_vec())
            .unwrap_or_default()
            .into_iter()
            .filter_map(LastFmTrack::into_catalog_track)
            .collect())
    }

    async fn top_tracks_by_artist(
        &self,
        artist: &str,
        limit: usize,
        page: u32,
    ) -> Result<Vec<TopTrack>, ProviderError> {
        let body: ArtistTopTracksResponse = self
            .call(
                "artist.gettoptracks",
                &[
                    ("artist", artist.to_string()),
                    ("limit", limit.to_string()),
                    ("page", page.to_string()),
                    ("autocorrect", "1".to_string()),
                ],
            )
            .await?;

        Ok(body
            .toptracks
            .map(|t| t.track.into_vec())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| {
                let name = t.name.filter(|n| !n.trim().is_empty())?;
                Some(TopTrack {
                    name,
                    image_url: best_image(&t.image),
                })
            })
            .collect())
    }

    async fn top_tracks_by_tag(
        &self,
        tag: &str,
        limit: usize,
        page: u32,
    ) -> Result<Vec<CatalogTrack>, ProviderError> {
        let body: TagTopTracksResponse = self
            .call(
                "tag.gettoptracks",
                &[
                    ("tag", tag.to_string()),
                    ("limit", limit.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        Ok(body
            .tracks
            .map(|t| t.track.into_vec())
            .unwrap_or_default()
            .into_iter()
            .filter_map(LastFmTrack::into_catalog_track)
            .collect())
    }
}

/// Last.fm acts as the last-resort artwork/album source.
#[async_trait]
impl EnrichmentProvider for LastFmClient {
    fn name(&self) -> &str {
        "lastfm"
    }

    async fn lookup(
        &self,
        name: &str,
        artist: &str,
    ) -> Result<Option<EnrichmentData>, ProviderError> {
        let body: TrackInfoResponse = self
            .call(
                "track.getinfo",
                &[
                    ("track", name.to_string()),
                    ("artist", artist.to_string()),
                    ("autocorrect", "1".to_string()),
                ],
            )
            .await?;

        let Some(track) = body.track else {
            return Ok(None);
        };
        let album = track.album;
        let data = EnrichmentData {
            preview_url: None,
            image_url: album.as_ref().and_then(|a| best_image(&a.image)),
            album: album.and_then(|a| a.title).filter(|t| !t.is_empty()),
            canonical_id: track.mbid.filter(|m| !m.is_empty()),
            uri: track.url,
        };
        Ok(if data.is_empty() { None } else { Some(data) })
    }
}

/// Pick the largest non-placeholder image from a Last.fm image list.
fn best_image(images: &[LastFmImage]) -> Option<String> {
    const PREFERRED: [&str; 4] = ["extralarge", "large", "medium", "small"];

    let usable = |img: &&LastFmImage| {
        !img.url.is_empty() && !img.url.contains(PLACEHOLDER_IMAGE_HASH)
    };

    PREFERRED
        .iter()
        .find_map(|size| {
            images
                .iter()
                .filter(usable)
                .find(|img| img.size.as_deref() == Some(*size))
        })
        .or_else(|| images.iter().filter(usable).last())
        .map(|img| img.url.clone())
}

// Last.fm API types

/// Last.fm collapses single-element arrays into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Artists appear either as a plain string or as `{ "name": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LastFmArtistRef {
    Name(String),
    Object { name: Option<String> },
}

impl LastFmArtistRef {
    fn into_name(self) -> Option<String> {
        match self {
            LastFmArtistRef::Name(name) => Some(name),
            LastFmArtistRef::Object { name } => name,
        }
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
struct LastFmImage {
    #[serde(rename = "#text", default)]
    url: String,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LastFmTrack {
    name: Option<String>,
    artist: Option<LastFmArtistRef>,
    #[serde(default, deserialize_with = "lenient_u64")]
    listeners: Option<u64>,
    #[serde(default)]
    image: Vec<LastFmImage>,
}

impl LastFmTrack {
    fn into_catalog_track(self) -> Option<CatalogTrack> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let artist = self
            .artist
            .and_then(LastFmArtistRef::into_name)
            .filter(|a| !a.trim().is_empty())?;
        Some(CatalogTrack {
            name,
            artist,
            listeners: self.listeners.unwrap_or(0),
            image_url: best_image(&self.image),
        })
    }
}

#[derive(Deserialize)]
struct TrackSearchResponse {
    results: Option<TrackSearchResults>,
}

#[derive(Deserialize)]
struct TrackSearchResults {
    trackmatches: Option<TrackMatches>,
}

#[derive(Deserialize)]
struct TrackMatches {
    #[serde(default)]
    track: OneOrMany<LastFmTrack>,
}

#[derive(Deserialize)]
struct SimilarArtistsResponse {
    similarartists: Option<SimilarArtistsContainer>,
}

#[derive(Deserialize)]
struct SimilarArtistsContainer {
    #[serde(default)]
    artist: OneOrMany<LastFmSimilarArtist>,
}

#[derive(Deserialize)]
struct LastFmSimilarArtist {
    name: Option<String>,
    #[serde(rename = "match", default, deserialize_with = "lenient_f64")]
    match_score: Option<f64>,
}

#[derive(Deserialize)]
struct SimilarTracksResponse {
    similartracks: Option<TrackList>,
}

#[derive(Deserialize)]
struct TagTopTracksResponse {
    tracks: Option<TrackList>,
}

#[derive(Deserialize)]
struct TrackList {
    #[serde(default)]
    track: OneOrMany<LastFmTrack>,
}

#[derive(Deserialize)]
struct ArtistTopTracksResponse {
    toptracks: Option<TopTrackList>,
}

#[derive(Deserialize)]
struct TopTrackList {
    #[serde(default)]
    track: OneOrMany<LastFmTopTrack>,
}

#[derive(Deserialize)]
struct LastFmTopTrack {
    name: Option<String>,
    #[serde(default)]
    image: Vec<LastFmImage>,
}

#[derive(Deserialize)]
struct TrackInfoResponse {
    track: Option<LastFmTrackInfo>,
}

#[derive(Deserialize)]
struct LastFmTrackInfo {
    mbid: Option<String>,
    url: Option<String>,
    album: Option<LastFmAlbum>,
}

#[derive(Deserialize)]
struct LastFmAlbum {
    title: Option<String>,
    #[serde(default)]
    image: Vec<LastFmImage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_response_with_array() {
        let body: TrackSearchResponse = serde_json::from_value(json!({
            "results": {
                "trackmatches": {
                    "track": [
                        {"name": "Imagine", "artist": "John Lennon", "listeners": "1234567", "image": []},
                        {"name": "", "artist": "Nobody", "listeners": "1"}
                    ]
                }
            }
        }))
        .unwrap();

        let tracks: Vec<CatalogTrack> = body
            .results
            .unwrap()
            .trackmatches
            .unwrap()
            .track
            .into_vec()
            .into_iter()
            .filter_map(LastFmTrack::into_catalog_track)
            .collect();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Imagine");
        assert_eq!(tracks[0].artist, "John Lennon");
        assert_eq!(tracks[0].listeners, 1234567);
    }

    #[test]
    fn test_single_track_object_and_artist_object() {
        let body: SimilarTracksResponse = serde_json::from_value(json!({
            "similartracks": {
                "track": {"name": "Jealous Guy", "artist": {"name": "John Lennon"}, "playcount": 100}
            }
        }))
        .unwrap();

        let tracks = body.similartracks.unwrap().track.into_vec();
        assert_eq!(tracks.len(), 1);
        let track = tracks.into_iter().next().unwrap().into_catalog_track().unwrap();
        assert_eq!(track.artist, "John Lennon");
        assert_eq!(track.listeners, 0);
    }

    #[test]
    fn test_similar_artist_match_as_string_or_number() {
        let body: SimilarArtistsResponse = serde_json::from_value(json!({
            "similarartists": {
                "artist": [
                    {"name": "Paul McCartney", "match": "0.87"},
                    {"name": "George Harrison", "match": 0.5},
                    {"name": "Ringo Starr"}
                ]
            }
        }))
        .unwrap();

        let artists = body.similarartists.unwrap().artist.into_vec();
        assert_eq!(artists[0].match_score, Some(0.87));
        assert_eq!(artists[1].match_score, Some(0.5));
        assert_eq!(artists[2].match_score, None);
    }

    #[test]
    fn test_empty_track_list_is_tolerated() {
        let body: TagTopTracksResponse =
            serde_json::from_value(json!({"tracks": {"@attr": {"page": "1"}}})).unwrap();
        assert!(body.tracks.unwrap().track.into_vec().is_empty());
    }

    #[test]
    fn test_best_image_skips_placeholder() {
        let images = vec![
            LastFmImage {
                url: format!("https://img/{}.png", PLACEHOLDER_IMAGE_HASH),
                size: Some("extralarge".to_string()),
            },
            LastFmImage {
                url: "https://img/cover-large.png".to_string(),
                size: Some("large".to_string()),
            },
            LastFmImage {
                url: String::new(),
                size: Some("medium".to_string()),
            },
        ];
        assert_eq!(
            best_image(&images),
            Some("https://img/cover-large.png".to_string())
        );
        assert_eq!(best_image(&[]), None);
    }
}
