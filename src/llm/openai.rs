//! Backend for any service speaking the OpenAI chat-completions API.

use super::provider::{decode_response, CompletionOptions, LlmError, LlmProvider, HEALTH_CHECK_TIMEOUT};
use super::types::{Completion, Message};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const API_KEY_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the bearer token comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiKeySource {
    None,
    Static(String),
    /// Shell command printing the key, run before every request so rotating
    /// tokens keep working.
    Command(String),
}

impl ApiKeySource {
    async fn resolve(&self) -> Result<Option<String>, LlmError> {
        match self {
            ApiKeySource::None => Ok(None),
            ApiKeySource::Static(key) => Ok(Some(key.clone())),
            ApiKeySource::Command(command) => run_key_command(command).await.map(Some),
        }
    }
}

async fn run_key_command(command: &str) -> Result<String, LlmError> {
    let output = tokio::time::timeout(
        API_KEY_COMMAND_TIMEOUT,
        Command::new("sh").arg("-c").arg(command).output(),
    )
    .await
    .map_err(|_| LlmError::Timeout)?
    .map_err(|e| LlmError::Connection(format!("Failed to run api_key_command: {}", e)))?;

    if !output.status.success() {
        warn!(
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "api_key_command failed"
        );
        return Err(LlmError::Connection(format!(
            "api_key_command exited with {}",
            output.status
        )));
    }

    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if key.is_empty() {
        return Err(LlmError::Connection("api_key_command printed nothing".to_string()));
    }
    Ok(key)
}

pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: ApiKeySource,
}

impl OpenAIProvider {
    /// `base_url` includes the version segment, e.g. `https://api.openai.com/v1`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: ApiKeySource) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, LlmError> {
        Ok(match self.api_key.resolve().await? {
            Some(key) => request.bearer_auth(key),
            None => request,
        })
    }

    fn chat_request<'a>(&'a self, messages: &'a [Message], options: &CompletionOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_output.then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError> {
        debug!(model = %self.model, messages = messages.len(), "Chat completion request");

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&self.chat_request(messages, options))
            .timeout(options.timeout);
        let response = self.authorized(request).await?.send().await?;
        let chat: ChatResponse = decode_response("chat completion", response).await?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in completion".to_string()))?;
        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            truncated: choice.finish_reason.as_deref() == Some("length"),
            total_tokens: chat.usage.map(|u| u.total_tokens),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let request = self
            .client
            .get(format!("{}/models", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT);
        let response = self.authorized(request).await?.send().await?;
        let _: serde_json::Value = decode_response("model list", response).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}
