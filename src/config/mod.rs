mod file_config;

pub use file_config::{
    EnrichmentConfig, FileConfig, LastFmConfig, LlmConfig, RecommendationsConfig,
};

use crate::enrichment::EnrichmentSettings;
use crate::llm::ApiKeySource;
use crate::recommend::{RecommendationSettings, SessionScope};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub lastfm_api_key: Option<String>,
    pub llm_provider: Option<LlmBackend>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmBackend {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
}

impl LlmBackend {
    fn default_base_url(&self) -> &'static str {
        match self {
            LlmBackend::Ollama => "http://localhost:11434",
            LlmBackend::OpenAI => "https://api.openai.com/v1",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            LlmBackend::Ollama => "llama3.1",
            LlmBackend::OpenAI => "gpt-4o-mini",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub lastfm_api_key: String,

    /// `None` disables the generative pipeline.
    pub llm: Option<LlmSettings>,
    pub recommendations: RecommendationSettings,
    pub enrichment: EnrichmentSettings,
    pub sources: EnrichmentSources,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub base_url: String,
    pub model: String,
    pub api_key: ApiKeySource,
    pub temperature: f32,
}

/// Which enrichment providers are wired in.
#[derive(Debug, Clone)]
pub struct EnrichmentSources {
    pub deezer: bool,
    pub itunes: bool,
    pub lastfm: bool,
    pub itunes_country: String,
}

impl Default for EnrichmentSources {
    fn default() -> Self {
        Self {
            deezer: true,
            itunes: true,
            lastfm: true,
            itunes_country: "US".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let lastfm_api_key = file
            .lastfm
            .and_then(|l| l.api_key)
            .or_else(|| cli.lastfm_api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Last.fm API key must be specified via --lastfm-api-key or in config file"
                )
            })?;

        let llm = resolve_llm(cli, file.llm)?;

        let defaults = RecommendationSettings::default();
        let rec_file = file.recommendations.unwrap_or_default();
        let session_scope = match rec_file.session_scope.as_deref() {
            None => defaults.session_scope,
            Some(s) => match parse_session_scope(s) {
                Some(scope) => scope,
                None => bail!("Unknown session_scope: {:?}", s),
            },
        };
        let provider_timeout = rec_file
            .provider_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.provider_timeout);
        let recommendations = RecommendationSettings {
            ai_max_per_artist: rec_file
                .ai_max_per_artist
                .unwrap_or(defaults.ai_max_per_artist),
            graph_max_per_artist: rec_file
                .graph_max_per_artist
                .unwrap_or(defaults.graph_max_per_artist),
            provider_timeout,
            pipeline_deadline: rec_file
                .pipeline_deadline_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.pipeline_deadline),
            session_scope,
        };

        let enrichment_defaults = EnrichmentSettings::default();
        let enrichment = EnrichmentSettings {
            batch_size: rec_file
                .enrichment_batch_size
                .unwrap_or(enrichment_defaults.batch_size)
                .max(1),
            batch_delay: rec_file
                .enrichment_batch_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(enrichment_defaults.batch_delay),
            provider_timeout,
        };

        let sources_file = file.enrichment.unwrap_or_default();
        let sources_defaults = EnrichmentSources::default();
        let sources = EnrichmentSources {
            deezer: sources_file.deezer_enabled.unwrap_or(sources_defaults.deezer),
            itunes: sources_file.itunes_enabled.unwrap_or(sources_defaults.itunes),
            lastfm: sources_file.lastfm_enabled.unwrap_or(sources_defaults.lastfm),
            itunes_country: sources_file
                .itunes_country
                .unwrap_or(sources_defaults.itunes_country),
        };

        Ok(Self {
            port,
            logging_level,
            lastfm_api_key,
            llm,
            recommendations,
            enrichment,
            sources,
        })
    }
}

fn resolve_llm(cli: &CliConfig, file: Option<LlmConfig>) -> Result<Option<LlmSettings>> {
    let file = file.unwrap_or_default();

    let backend = match file.provider.as_deref() {
        Some(s) => match LlmBackend::from_str(s, true) {
            Ok(backend) => Some(backend),
            Err(_) => bail!("Unknown LLM provider: {:?}", s),
        },
        None => cli.llm_provider,
    };
    let Some(backend) = backend else {
        return Ok(None);
    };

    let api_key = match (file.api_key_command, file.api_key, cli.llm_api_key.clone()) {
        (Some(command), _, _) => ApiKeySource::Command(command),
        (None, Some(key), _) | (None, None, Some(key)) => ApiKeySource::Static(key),
        (None, None, None) => ApiKeySource::None,
    };

    let temperature = file.temperature.unwrap_or(0.9);
    if !(0.0..=2.0).contains(&temperature) {
        bail!("LLM temperature must be within [0, 2], got {}", temperature);
    }

    Ok(Some(LlmSettings {
        backend,
        base_url: file
            .base_url
            .or_else(|| cli.llm_base_url.clone())
            .unwrap_or_else(|| backend.default_base_url().to_string()),
        model: file
            .model
            .or_else(|| cli.llm_model.clone())
            .unwrap_or_else(|| backend.default_model().to_string()),
        api_key,
        temperature,
    }))
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

fn parse_session_scope(s: &str) -> Option<SessionScope> {
    match s.to_ascii_lowercase().as_str() {
        "instance" => Some(SessionScope::Instance),
        "request" => Some(SessionScope::Request),
        _ => None,
    }
}
