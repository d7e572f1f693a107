//! Recommendation pipelines.
//!
//! [`RecommendationOrchestrator`] exposes two entry points: a generative
//! pipeline that validates model suggestions against the catalog, and a
//! similarity-graph pipeline that walks related artists and tracks. Both end
//! with the same enrichment cascade.

mod error;
mod filters;
mod graph_pipeline;
pub mod intent;
mod models;
mod orchestrator;
pub mod random;
mod session;
mod suggester;
mod validator;

pub use error::RecommendError;
pub use filters::{apply_diversity_filter, deduplicate_tracks};
pub use intent::Intent;
pub use models::{
    derive_track_id, Candidate, ClampedRequest, ListeningContext, RecommendationRequest,
    SimilarityRequest, Track, DEFAULT_LIMIT, DEFAULT_REASON, MAX_LIMIT, MIN_LIMIT,
    NO_ARTWORK_IMAGE,
};
pub use orchestrator::{RecommendationOrchestrator, RecommendationSettings};
pub use random::{RandomSource, ScriptedRandom, ThreadRandom};
pub use session::{SessionDedupState, SessionScope};
pub use suggester::{GenerativeSuggester, LlmSuggester, SuggestionRequest};
pub use validator::TrackValidator;
