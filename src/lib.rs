//! Music discovery server library.
//!
//! Recommends tracks either from a generative model whose suggestions are
//! validated against a music catalog, or by walking the catalog's similarity
//! graph, then attaches preview audio and artwork from public APIs.

pub mod catalog;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod llm;
pub mod recommend;
pub mod server;
pub mod text;
pub mod timing;

// Re-export commonly used types for convenience
pub use error::ProviderError;
pub use recommend::{
    RecommendError, RecommendationOrchestrator, RecommendationRequest, RecommendationSettings,
    SimilarityRequest, Track,
};
pub use server::{run_server, RequestsLoggingLevel};
