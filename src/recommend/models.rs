//! Request and result types of the recommendation pipelines.

use super::error::RecommendError;
use crate::text::dedup_key;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Image used when no provider supplied artwork.
pub const NO_ARTWORK_IMAGE: &str = "/static/no-artwork.png";

/// Reason attached to generated tracks when the model gave none.
pub const DEFAULT_REASON: &str = "Recommended based on your request";

pub const MIN_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;
pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_MIN_TRACKS: usize = 10;
pub const MAX_RETRIES: usize = 3;
pub const DEFAULT_MAX_RETRIES: usize = 2;
pub const MAX_PROMPT_CHARS: usize = 1000;

pub const MAX_CONTEXT_ARTISTS: usize = 15;
pub const MAX_CONTEXT_SONGS: usize = 5;
pub const MAX_CONTEXT_ALBUMS: usize = 5;

/// A recommended track. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
    pub image_url: Option<String>,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    pub listeners: u64,
    pub reason: Option<String>,
}

impl Track {
    /// Build a track with base metadata only. The id is derived from the
    /// normalized name and artist so it stays stable across calls.
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        let name = name.into();
        let artist = artist.into();
        Self {
            id: derive_track_id(&name, &artist),
            name,
            artist,
            album: None,
            image_url: Some(NO_ARTWORK_IMAGE.to_string()),
            preview_url: None,
            external_url: None,
            listeners: 0,
            reason: None,
        }
    }

    pub fn with_listeners(mut self, listeners: u64) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        if let Some(url) = image_url.filter(|u| !u.is_empty()) {
            self.image_url = Some(url);
        }
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn has_artwork(&self) -> bool {
        matches!(&self.image_url, Some(url) if !url.is_empty() && url != NO_ARTWORK_IMAGE)
    }

    pub fn has_preview(&self) -> bool {
        matches!(&self.preview_url, Some(url) if !url.is_empty())
    }
}

/// Deterministic id for tracks without a catalog identifier.
pub fn derive_track_id(name: &str, artist: &str) -> String {
    let digest = Sha256::digest(dedup_key(name, artist).as_bytes());
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("gen-{}", hex)
}

/// An untrusted suggestion from the generative model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub reason: Option<String>,
}

impl Candidate {
    pub fn new(name: &str, artist: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            artist: Some(artist.to_string()),
            reason: None,
        }
    }
}

/// Listening history used to bias generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListeningContext {
    pub top_artists: Vec<String>,
    pub recent_songs: Vec<String>,
    pub albums: Vec<String>,
}

impl ListeningContext {
    /// Render the context as prompt text, honoring the per-list caps.
    /// Returns `None` when there is nothing to say.
    pub fn describe(&self) -> Option<String> {
        fn non_empty(items: &[String], cap: usize) -> Vec<&str> {
            items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .take(cap)
                .collect()
        }

        let artists = non_empty(&self.top_artists, MAX_CONTEXT_ARTISTS);
        let songs = non_empty(&self.recent_songs, MAX_CONTEXT_SONGS);
        let albums = non_empty(&self.albums, MAX_CONTEXT_ALBUMS);

        let mut lines = Vec::new();
        if !artists.is_empty() {
            lines.push(format!("User's top artists: {}", artists.join(", ")));
        }
        if !songs.is_empty() {
            lines.push(format!("Recently played: {}", songs.join(", ")));
        }
        if !albums.is_empty() {
            lines.push(format!("Favorite albums: {}", albums.join(", ")));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Input of the generative pipeline, as received from callers. Numeric
/// fields are clamped, never rejected.
#[derive(Debug, Clone, Default)]
pub struct RecommendationRequest {
    pub prompt: String,
    pub limit: Option<i64>,
    pub min_tracks: Option<i64>,
    pub max_retries: Option<i64>,
    pub context: ListeningContext,
}

impl RecommendationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Validate the prompt and clamp every numeric field into range.
    pub fn clamp(&self) -> Result<ClampedRequest, RecommendError> {
        let prompt = validate_prompt(&self.prompt)?;
        let limit = clamp_limit(self.limit);
        let min_tracks = self
            .min_tracks
            .unwrap_or(DEFAULT_MIN_TRACKS as i64)
            .clamp(1, limit as i64) as usize;
        let max_retries = self
            .max_retries
            .unwrap_or(DEFAULT_MAX_RETRIES as i64)
            .clamp(0, MAX_RETRIES as i64) as usize;

        Ok(ClampedRequest {
            prompt,
            limit,
            min_tracks,
            max_retries,
            context: self.context.describe(),
        })
    }
}

/// A [`RecommendationRequest`] with every invariant established.
#[derive(Debug, Clone, PartialEq)]
pub struct ClampedRequest {
    pub prompt: String,
    pub limit: usize,
    pub min_tracks: usize,
    pub max_retries: usize,
    pub context: Option<String>,
}

/// Input of the similarity-graph pipeline.
#[derive(Debug, Clone, Default)]
pub struct SimilarityRequest {
    pub prompt: String,
    pub limit: Option<i64>,
}

impl SimilarityRequest {
    pub fn new(prompt: impl Into<String>, limit: Option<i64>) -> Self {
        Self {
            prompt: prompt.into(),
            limit,
        }
    }
}

pub(crate) fn clamp_limit(limit: Option<i64>) -> usize {
    limit
        .unwrap_or(DEFAULT_LIMIT as i64)
        .clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as usize
}

/// Trim the prompt, reject it if empty and truncate to the maximum length.
pub(crate) fn validate_prompt(prompt: &str) -> Result<String, RecommendError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(RecommendError::InvalidArgument(
            "prompt must be a non-empty string".to_string(),
        ));
    }
    Ok(trimmed.chars().take(MAX_PROMPT_CHARS).collect())
}
