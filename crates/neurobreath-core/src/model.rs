//! Chat model seam and the OpenAI-compatible HTTP client behind it.
//!
//! The assembler only ever sees [`ChatModel`]; tests swap in stubs.

use crate::config::ModelConfig;
use crate::types::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://apps.abacus.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model response could not be parsed: {0}")]
    Parse(String),
    #[error("model returned no choices")]
    Empty,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One non-streaming completion over the full message list (system prompt first).
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError>;

    fn name(&self) -> &str {
        "chat-model"
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `POST {api_url}` with a bearer token; body `{model, messages, stream: false, max_tokens, temperature}`.
pub struct ChatCompletionsClient {
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, Duration::from_secs(30))
    }

    fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 800,
            temperature: 0.4,
            client,
        }
    }

    /// `None` when no credential is configured.
    pub fn from_config(cfg: &ModelConfig) -> Option<Self> {
        let key = cfg.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        Some(
            Self::with_timeout(key, Duration::from_secs(cfg.timeout_secs))
                .with_api_url(&cfg.api_url)
                .with_model(&cfg.name)
                .with_sampling(cfg.max_tokens, cfg.temperature),
        )
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ChatModel for ChatCompletionsClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            stream: false,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        let parsed: CompletionResponse = res
            .json()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::Empty)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[test]
    fn request_body_matches_wire_shape() {
        let msgs = vec![
            ChatMessage::new(MessageRole::System, "sys"),
            ChatMessage::new(MessageRole::User, "hi"),
        ];
        let body = CompletionRequest {
            model: DEFAULT_MODEL,
            messages: &msgs,
            stream: false,
            max_tokens: 800,
            temperature: 0.4,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "gpt-4.1-mini");
        assert_eq!(v["stream"], false);
        assert_eq!(v["max_tokens"], 800);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hi");
    }

    #[test]
    fn blank_key_means_no_client() {
        let mut cfg = ModelConfig::default();
        cfg.api_key = Some("   ".into());
        assert!(ChatCompletionsClient::from_config(&cfg).is_none());
        cfg.api_key = Some("sk-test".into());
        let client = ChatCompletionsClient::from_config(&cfg).unwrap();
        assert_eq!(client.name(), "gpt-4.1-mini");
        assert_eq!(client.api_url, DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        let client = ChatCompletionsClient::with_timeout("k", Duration::from_secs(2))
            .with_api_url("http://127.0.0.1:9/v1/chat/completions");
        let err = client
            .complete(&[ChatMessage::new(MessageRole::User, "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Request(_)));
    }
}
