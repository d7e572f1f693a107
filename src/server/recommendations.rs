//! Recommendation endpoints.
//!
//! Any body problem (malformed JSON, a non-object, a non-string prompt)
//! yields the same generic 400 instead of axum's extractor rejection text.

use super::state::GuardedOrchestrator;
use crate::recommend::{ListeningContext, RecommendError, RecommendationRequest, SimilarityRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let status = match &self {
            RecommendError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RecommendError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        warn!("Recommendation request rejected: {}", self);
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Body of `POST /prompt`. Numbers of any JSON numeric form are clamped
/// later; values of another type fall back to the defaults.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptRecommendationBody {
    #[serde(default)]
    prompt: Value,
    #[serde(default)]
    limit: Value,
    #[serde(default)]
    min_tracks: Value,
    #[serde(default)]
    max_retries: Value,
    #[serde(default)]
    context: Value,
}

#[derive(Deserialize)]
struct SimilarRecommendationBody {
    #[serde(default)]
    prompt: Value,
    #[serde(default)]
    limit: Value,
}

fn invalid(message: &str) -> RecommendError {
    RecommendError::InvalidArgument(message.to_string())
}

fn parse_body<T: DeserializeOwned>(body: Result<Json<Value>, JsonRejection>) -> Result<T, RecommendError> {
    match body {
        Ok(Json(value)) if value.is_object() => {
            serde_json::from_value(value).map_err(|_| invalid("body has the wrong shape"))
        }
        Ok(_) => Err(invalid("body must be a JSON object")),
        Err(rejection) => {
            debug!("Rejected body: {}", rejection.body_text());
            Err(invalid("body is not valid JSON"))
        }
    }
}

fn prompt_string(prompt: Value) -> Result<String, RecommendError> {
    match prompt {
        Value::String(prompt) => Ok(prompt),
        _ => Err(invalid("prompt must be a string")),
    }
}

fn lenient_int(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A non-object context is ignored.
fn listening_context(context: &Value) -> ListeningContext {
    if !context.is_object() {
        return ListeningContext::default();
    }
    ListeningContext {
        top_artists: string_list(context.get("topArtists")),
        recent_songs: string_list(context.get("recentSongs")),
        albums: string_list(context.get("albums")),
    }
}

impl TryFrom<PromptRecommendationBody> for RecommendationRequest {
    type Error = RecommendError;

    fn try_from(body: PromptRecommendationBody) -> Result<Self, Self::Error> {
        Ok(RecommendationRequest {
            limit: lenient_int(&body.limit),
            min_tracks: lenient_int(&body.min_tracks),
            max_retries: lenient_int(&body.max_retries),
            context: listening_context(&body.context),
            prompt: prompt_string(body.prompt)?,
        })
    }
}

impl TryFrom<SimilarRecommendationBody> for SimilarityRequest {
    type Error = RecommendError;

    fn try_from(body: SimilarRecommendationBody) -> Result<Self, Self::Error> {
        let limit = lenient_int(&body.limit);
        Ok(SimilarityRequest::new(prompt_string(body.prompt)?, limit))
    }
}

async fn post_prompt_recommendations(
    State(orchestrator): State<GuardedOrchestrator>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    // A missing model is reported before the body is looked at
    if !orchestrator.ai_enabled() {
        return RecommendError::ServiceUnavailable("no generative provider configured".to_string())
            .into_response();
    }
    let request = parse_body::<PromptRecommendationBody>(body).and_then(RecommendationRequest::try_from);
    let request = match request {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match orchestrator.generate_from_prompt(&request).await {
        Ok(tracks) => Json(tracks).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn post_similar_recommendations(
    State(orchestrator): State<GuardedOrchestrator>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = parse_body::<SimilarRecommendationBody>(body).and_then(SimilarityRequest::try_from);
    let request = match request {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match orchestrator.generate_from_similarity_graph(&request).await {
        Ok(tracks) => Json(tracks).into_response(),
        Err(e) => e.into_response(),
    }
}

pub(super) fn make_recommendation_routes(orchestrator: GuardedOrchestrator) -> Router {
    Router::new()
        .route("/prompt", post(post_prompt_recommendations))
        .route("/similar", post(post_similar_recommendations))
        .with_state(orchestrator)
}
