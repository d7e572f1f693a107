use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use discovery_server::catalog::LastFmClient;
use discovery_server::config::{AppConfig, CliConfig, FileConfig, LlmBackend, LlmSettings};
use discovery_server::enrichment::{DeezerClient, Enricher, ItunesClient};
use discovery_server::llm::{CompletionOptions, LlmProvider, OllamaProvider, OpenAIProvider};
use discovery_server::recommend::{LlmSuggester, RecommendationOrchestrator};
use discovery_server::server::{run_server, RequestsLoggingLevel, ServerConfig};

/// Timeout applied to every outbound HTTP request by the reqwest clients.
/// Per-call pipeline timeouts are usually shorter.
const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI flags.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Last.fm API key, required for catalog lookups.
    #[clap(long, env = "LASTFM_API_KEY", hide_env_values = true)]
    pub lastfm_api_key: Option<String>,

    /// Generative backend. Without one only similarity-graph recommendations
    /// are served.
    #[clap(long, value_enum)]
    pub llm_provider: Option<LlmBackend>,

    /// Base URL of the generative backend.
    #[clap(long)]
    pub llm_base_url: Option<String>,

    /// Model name passed to the generative backend.
    #[clap(long)]
    pub llm_model: Option<String>,

    /// API key for OpenAI-compatible backends.
    #[clap(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            port: self.port,
            logging_level: self.logging_level.clone(),
            lastfm_api_key: self.lastfm_api_key.clone(),
            llm_provider: self.llm_provider,
            llm_base_url: self.llm_base_url.clone(),
            llm_model: self.llm_model.clone(),
            llm_api_key: self.llm_api_key.clone(),
        }
    }
}

fn build_llm_provider(settings: &LlmSettings) -> Arc<dyn LlmProvider> {
    match settings.backend {
        LlmBackend::Ollama => Arc::new(OllamaProvider::new(&settings.base_url, &settings.model)),
        LlmBackend::OpenAI => Arc::new(OpenAIProvider::new(
            &settings.base_url,
            &settings.model,
            settings.api_key.clone(),
        )),
    }
}

async fn build_orchestrator(config: &AppConfig) -> Result<RecommendationOrchestrator> {
    let lastfm = Arc::new(
        LastFmClient::new(&config.lastfm_api_key, HTTP_CLIENT_TIMEOUT)
            .context("Failed to create Last.fm client")?,
    );

    let mut enricher = Enricher::new(config.enrichment.clone());
    if config.sources.deezer {
        info!("Enrichment: Deezer enabled as primary source");
        enricher = enricher.with_primary(Arc::new(DeezerClient::new(HTTP_CLIENT_TIMEOUT)?));
    }
    if config.sources.itunes {
        info!(
            "Enrichment: iTunes enabled (country {})",
            config.sources.itunes_country
        );
        enricher = enricher.with_fallback(Arc::new(ItunesClient::new(
            &config.sources.itunes_country,
            HTTP_CLIENT_TIMEOUT,
        )?));
    }
    if config.sources.lastfm {
        enricher = enricher.with_fallback(lastfm.clone());
    }

    let mut orchestrator =
        RecommendationOrchestrator::new(lastfm, enricher, config.recommendations.clone());

    match &config.llm {
        Some(llm) => {
            let provider = build_llm_provider(llm);
            info!(
                "Generative recommendations enabled: {} ({})",
                provider.name(),
                provider.model()
            );
            if let Err(e) = provider.health_check().await {
                warn!("LLM health check failed, requests may fail: {}", e);
            }
            let options = CompletionOptions {
                temperature: llm.temperature,
                timeout: config.recommendations.pipeline_deadline,
                ..Default::default()
            };
            orchestrator = orchestrator.with_suggester(Arc::new(LlmSuggester::new(provider, options)));
        }
        None => info!("No LLM configured, generative recommendations disabled"),
    }

    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let orchestrator = build_orchestrator(&config).await?;
    info!(
        "Session scope: {:?}, diversity caps: {} (generative) / {} (graph)",
        config.recommendations.session_scope,
        config.recommendations.ai_max_per_artist,
        config.recommendations.graph_max_per_artist
    );

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
    };
    info!("Ready to serve at port {}!", config.port);
    run_server(server_config, Arc::new(orchestrator)).await
}
