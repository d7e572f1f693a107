use anyhow::{Context, Result};
use std::time::Duration;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use super::recommendations::make_recommendation_routes;
use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub status: &'static str,
    pub uptime: String,
    pub version: String,
    pub ai_enabled: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        status: "ok",
        uptime: format_uptime(state.start_time.elapsed()),
        version: state.version.clone(),
        ai_enabled: state.orchestrator.ai_enabled(),
    })
}

pub fn make_app(config: ServerConfig, orchestrator: GuardedOrchestrator) -> Router {
    let state = ServerState::new(config, orchestrator.clone());

    let home_router: Router = Router::new()
        .route("/", get(health))
        .route("/v1/health", get(health))
        .with_state(state.clone());

    home_router
        .nest(
            "/v1/recommendations",
            make_recommendation_routes(orchestrator),
        )
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(config: ServerConfig, orchestrator: GuardedOrchestrator) -> Result<()> {
    let port = config.port;
    let app = make_app(config, orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
