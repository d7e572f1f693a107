use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub logging_level: Option<String>,

    // Feature configs
    pub lastfm: Option<LastFmConfig>,
    pub llm: Option<LlmConfig>,
    pub recommendations: Option<RecommendationsConfig>,
    pub enrichment: Option<EnrichmentConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend to use: "ollama", "openai"
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Shell command printing the API key, run on every request
    pub api_key_command: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RecommendationsConfig {
    pub ai_max_per_artist: Option<usize>,
    pub graph_max_per_artist: Option<usize>,
    pub enrichment_batch_size: Option<usize>,
    pub enrichment_batch_delay_ms: Option<u64>,
    pub provider_timeout_secs: Option<u64>,
    pub pipeline_deadline_secs: Option<u64>,
    /// "instance" or "request"
    pub session_scope: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub deezer_enabled: Option<bool>,
    pub itunes_enabled: Option<bool>,
    pub lastfm_enabled: Option<bool>,
    pub itunes_country: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
