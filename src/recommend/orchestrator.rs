//! Entry point of both recommendation pipelines.

use super::error::RecommendError;
use super::filters::apply_diversity_filter;
use super::models::{RecommendationRequest, Track, DEFAULT_REASON};
use super::random::{shuffle, RandomSource, ThreadRandom};
use super::session::{SessionDedupState, SessionScope};
use super::suggester::{GenerativeSuggester, SuggestionRequest};
use super::validator::TrackValidator;
use crate::catalog::CatalogClient;
use crate::enrichment::Enricher;
use crate::text::session_key;
use crate::timing::{call_provider, Deadline};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extra candidates requested from the model beyond `limit`, since some
/// will fail validation.
const SUGGESTION_HEADROOM: usize = 10;
const MAX_SUGGESTIONS_PER_ATTEMPT: usize = 60;

#[derive(Debug, Clone)]
pub struct RecommendationSettings {
    pub ai_max_per_artist: usize,
    pub graph_max_per_artist: usize,
    pub provider_timeout: Duration,
    pub pipeline_deadline: Duration,
    pub session_scope: SessionScope,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            ai_max_per_artist: 3,
            graph_max_per_artist: 2,
            provider_timeout: Duration::from_secs(8),
            pipeline_deadline: Duration::from_secs(45),
            session_scope: SessionScope::Instance,
        }
    }
}

pub struct RecommendationOrchestrator {
    pub(super) catalog: Arc<dyn CatalogClient>,
    suggester: Option<Arc<dyn GenerativeSuggester>>,
    validator: TrackValidator,
    pub(super) enricher: Enricher,
    pub(super) random: Arc<dyn RandomSource>,
    session: Arc<SessionDedupState>,
    pub(super) settings: RecommendationSettings,
}

impl RecommendationOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        enricher: Enricher,
        settings: RecommendationSettings,
    ) -> Self {
        Self {
            validator: TrackValidator::new(catalog.clone(), settings.provider_timeout),
            catalog,
            suggester: None,
            enricher,
            random: Arc::new(ThreadRandom),
            session: Arc::new(SessionDedupState::new()),
            settings,
        }
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn GenerativeSuggester>) -> Self {
        self.suggester = Some(suggester);
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Share an existing session state, e.g. between orchestrators.
    pub fn with_session(mut self, session: Arc<SessionDedupState>) -> Self {
        self.session = session;
        self
    }

    pub fn ai_enabled(&self) -> bool {
        self.suggester.is_some()
    }

    pub fn session(&self) -> &Arc<SessionDedupState> {
        &self.session
    }

    /// State consulted and updated by one call.
    pub(super) fn session_for_call(&self) -> Arc<SessionDedupState> {
        match self.settings.session_scope {
            SessionScope::Instance => self.session.clone(),
            SessionScope::Request => Arc::new(SessionDedupState::new()),
        }
    }

    pub(super) fn deadline(&self) -> Deadline {
        Deadline::after(self.settings.pipeline_deadline)
    }

    /// Generate recommendations with the generative model, validating every
    /// suggestion against the catalog.
    ///
    /// Best effort: an empty list is a valid outcome. Only a missing model
    /// or an unusable prompt fail the call.
    pub async fn generate_from_prompt(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Track>, RecommendError> {
        let suggester = self.suggester.as_ref().ok_or_else(|| {
            RecommendError::ServiceUnavailable("no generative provider configured".to_string())
        })?;
        let request = request.clamp()?;
        let deadline = self.deadline();
        let session = self.session_for_call();

        let count = (request.limit + SUGGESTION_HEADROOM).min(MAX_SUGGESTIONS_PER_ATTEMPT);
        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted: Vec<Track> = Vec::new();

        for attempt in 0..=request.max_retries {
            if deadline.expired() {
                info!(attempt, "Deadline reached, no further generation attempts");
                break;
            }

            let suggestion_request = SuggestionRequest {
                prompt: request.prompt.clone(),
                context: request.context.clone(),
                count,
                attempt,
                exclude: accepted
                    .iter()
                    .map(|t| format!("{} - {}", t.name, t.artist))
                    .collect(),
            };
            // Generation is slow, so an attempt may use whatever is left of
            // the deadline rather than the per-call timeout.
            let candidates = call_provider(
                "generative",
                "suggest",
                deadline.remaining(),
                suggester.suggest(&suggestion_request),
            )
            .await
            .unwrap_or_default();

            let before = accepted.len();
            for candidate in candidates {
                let (Some(name), Some(artist)) = (candidate.name, candidate.artist) else {
                    continue;
                };
                let key = session_key(&name, &artist);
                if seen.contains(&key) || session.contains_key(&key) {
                    continue;
                }

                let Some(valid) = self.validator.validate(&name, &artist).await else {
                    debug!(name = %name, artist = %artist, "Candidate failed validation");
                    continue;
                };
                let canonical_key = session_key(&valid.name, &valid.artist);
                if seen.contains(&canonical_key) || session.contains_key(&canonical_key) {
                    continue;
                }
                seen.insert(key);
                seen.insert(canonical_key);

                accepted.push(
                    Track::new(valid.name, valid.artist)
                        .with_listeners(valid.listeners)
                        .with_image(valid.image_url)
                        .with_reason(candidate.reason.unwrap_or_else(|| DEFAULT_REASON.to_string())),
                );
            }

            let added = accepted.len() - before;
            info!(attempt, added, total = accepted.len(), "Generation attempt finished");
            if accepted.len() >= request.min_tracks {
                break;
            }
            if added == 0 {
                warn!(attempt, "Attempt produced no new tracks, stopping");
                break;
            }
        }

        let mut tracks = apply_diversity_filter(accepted, self.settings.ai_max_per_artist);
        shuffle(self.random.as_ref(), &mut tracks);
        tracks.truncate(request.limit);

        session.record(tracks.iter().map(|t| (t.name.as_str(), t.artist.as_str())));
        Ok(self.enricher.enrich(tracks, &deadline).await)
    }
}
