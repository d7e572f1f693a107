//! Generative track suggestions backed by an [`LlmProvider`].
//!
//! The model is untrusted: output is parsed leniently and every candidate
//! is validated against the catalog afterwards.

use super::models::Candidate;
use crate::error::ProviderError;
use crate::llm::{CompletionOptions, LlmProvider, Message};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cap on already-accepted tracks echoed back to the model on retries.
const MAX_EXCLUDED_IN_PROMPT: usize = 30;

const SYSTEM_PROMPT: &str = "You are a music recommendation engine. \
Recommend real, released songs that exist on major streaming services. \
Reply with JSON only, no prose, using exactly this shape: \
{\"tracks\": [{\"name\": \"song title\", \"artist\": \"artist name\", \"reason\": \"one short sentence\"}]}";

const DIVERSIFY_HINT: &str =
    "Suggest different, less obvious artists than in previous suggestions.";

/// One generation attempt.
#[derive(Debug, Clone, Default)]
pub struct SuggestionRequest {
    pub prompt: String,
    pub context: Option<String>,
    pub count: usize,
    /// Zero-based attempt number; retries ask for more variety.
    pub attempt: usize,
    /// "name - artist" of tracks already accepted in earlier attempts.
    pub exclude: Vec<String>,
}

#[async_trait]
pub trait GenerativeSuggester: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Candidate>, ProviderError>;
}

pub struct LlmSuggester {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl LlmSuggester {
    pub fn new(provider: Arc<dyn LlmProvider>, options: CompletionOptions) -> Self {
        Self { provider, options }
    }
}

#[async_trait]
impl GenerativeSuggester for LlmSuggester {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Candidate>, ProviderError> {
        let messages = build_messages(request);
        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            attempt = request.attempt,
            "Requesting suggestions"
        );

        let completion = self.provider.complete(&messages, &self.options).await?;
        if completion.truncated {
            warn!(tokens = ?completion.total_tokens, "Model output hit the token limit");
        }
        let candidates = parse_candidates(&completion.content)?;
        debug!(count = candidates.len(), "Model returned candidates");
        Ok(candidates)
    }
}

pub(crate) fn build_messages(request: &SuggestionRequest) -> Vec<Message> {
    let mut user = format!("Request: {}\n", request.prompt);
    if let Some(context) = &request.context {
        user.push_str(context);
        user.push('\n');
    }
    user.push_str(&format!("Suggest {} songs.", request.count));
    if request.attempt > 0 {
        user.push('\n');
        user.push_str(DIVERSIFY_HINT);
        if !request.exclude.is_empty() {
            let excluded: Vec<&str> = request
                .exclude
                .iter()
                .take(MAX_EXCLUDED_IN_PROMPT)
                .map(String::as_str)
                .collect();
            user.push_str(&format!("\nDo not repeat: {}", excluded.join("; ")));
        }
    }

    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}

/// Parse model output into candidates.
///
/// Accepts a bare array or an object carrying a `tracks`, `songs` or
/// `recommendations` array, optionally wrapped in a markdown code fence or
/// surrounded by prose. Fields that are not strings become `None`.
pub(crate) fn parse_candidates(content: &str) -> Result<Vec<Candidate>, ProviderError> {
    let body = strip_code_fence(content);
    let value = serde_json::from_str::<Value>(body)
        .ok()
        .or_else(|| extract_json(body))
        .ok_or_else(|| ProviderError::InvalidResponse("Model output is not JSON".to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => ["tracks", "songs", "recommendations"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                ProviderError::InvalidResponse("Model output has no track list".to_string())
            })?,
        _ => {
            return Err(ProviderError::InvalidResponse(
                "Model output is not a list".to_string(),
            ))
        }
    };

    Ok(items.iter().map(candidate_from_value).collect())
}

fn candidate_from_value(value: &Value) -> Candidate {
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    Candidate {
        name: field(&["name", "title", "track"]),
        artist: field(&["artist"]),
        reason: field(&["reason"]),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line, e.g. "```json"
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

/// Fall back to the outermost bracketed span when the model wrapped the
/// JSON in prose.
fn extract_json(content: &str) -> Option<Value> {
    [('[', ']'), ('{', '}')].iter().find_map(|(open, close)| {
        let start = content.find(*open)?;
        let end = content.rfind(*close)?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&content[start..=end]).ok()
    })
}
