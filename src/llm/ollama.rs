//! Local Ollama backend, through its `/api/chat` endpoint.

use super::provider::{decode_response, CompletionOptions, LlmError, LlmProvider, HEALTH_CHECK_TIMEOUT};
use super::types::{Completion, Message};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// `base_url` is the server root, e.g. `http://localhost:11434`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn chat_request<'a>(&'a self, messages: &'a [Message], options: &CompletionOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: options.json_output.then_some("json"),
            options: SamplingOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError> {
        debug!(model = %self.model, messages = messages.len(), "Ollama chat request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.chat_request(messages, options))
            .timeout(options.timeout)
            .send()
            .await?;
        let chat: ChatResponse = decode_response("Ollama", response).await?;

        let total_tokens = match (chat.prompt_eval_count, chat.eval_count) {
            (None, None) => None,
            (prompt, output) => Some(prompt.unwrap_or(0) + output.unwrap_or(0)),
        };
        Ok(Completion {
            content: chat.message.content,
            truncated: chat.done_reason.as_deref() == Some("length"),
            total_tokens,
        })
    }

    /// The server must answer and have the configured model pulled.
    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await?;
        let tags: TagsResponse = decode_response("Ollama", response).await?;

        if tags.models.iter().any(|m| m.name == self.model) {
            Ok(())
        } else {
            Err(LlmError::Api {
                status: 404,
                message: format!(
                    "model {} is not pulled (available: {})",
                    self.model,
                    tags.models.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
                ),
            })
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: SamplingOptions,
}

#[derive(Serialize)]
struct SamplingOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}
