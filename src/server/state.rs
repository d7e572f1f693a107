use axum::extract::FromRef;

use crate::recommend::RecommendationOrchestrator;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedOrchestrator = Arc<RecommendationOrchestrator>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub orchestrator: GuardedOrchestrator,
    pub version: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, orchestrator: GuardedOrchestrator) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            orchestrator,
            version: env!("BUILD_VERSION").to_string(),
        }
    }
}

impl FromRef<ServerState> for GuardedOrchestrator {
    fn from_ref(input: &ServerState) -> Self {
        input.orchestrator.clone()
    }
}
