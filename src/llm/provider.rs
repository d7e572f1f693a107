//! Completion backend abstraction and its error type.

use super::types::{Completion, Message};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Timeout of the reachability probe run at startup.
pub(super) const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
    /// Ask the backend to constrain output to a JSON document.
    pub json_output: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            max_tokens: Some(2048),
            timeout: Duration::from_secs(30),
            json_output: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,
}

impl From<LlmError> for ProviderError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Connection(msg) => ProviderError::Connection(msg),
            LlmError::Api { status, message } => ProviderError::Api { status, message },
            LlmError::InvalidResponse(msg) => ProviderError::InvalidResponse(msg),
            LlmError::RateLimited => ProviderError::RateLimited,
            LlmError::Timeout => ProviderError::Timeout,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Connection(e.to_string())
        }
    }
}

/// Check the status of a backend response and decode its JSON body.
pub(super) async fn decode_response<T: DeserializeOwned>(
    backend: &str,
    response: reqwest::Response,
) -> Result<T, LlmError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(LlmError::RateLimited);
    }
    if !status.is_success() {
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse {} response: {}", backend, e)))
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name, e.g. "ollama".
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError>;

    /// Probe the backend. Only used for startup diagnostics.
    async fn health_check(&self) -> Result<(), LlmError>;
}
