//! OpenAI-compatible chat-completions backend.
//!
//! Talks to any service exposing the `/chat/completions` shape — DeepSeek by
//! default. One request, one response, hard timeout; any non-2xx status is a
//! failure surfaced to the caller.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::{ChatRequest, LlmBackend};
use crate::error::{LlmError, Result};

/// Default base URL (DeepSeek's OpenAI-compatible endpoint).
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token for authentication.
    pub api_key: String,
    /// Base URL of the API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Hard timeout for a single request.
    pub timeout: Duration,
    /// Name for this backend instance.
    pub name: String,
}

impl OpenAiConfig {
    /// Config for DeepSeek with the given API key.
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "deepseek-chat".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            name: "deepseek".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

fn to_wire(config: &OpenAiConfig, request: &ChatRequest) -> WireRequest {
    let mut messages = Vec::with_capacity(2);
    if !request.system.is_empty() {
        messages.push(WireMessage {
            role: "system".to_string(),
            content: request.system.clone(),
        });
    }
    messages.push(WireMessage {
        role: "user".to_string(),
        content: request.prompt.clone(),
    });
    WireRequest {
        model: config.model.clone(),
        messages,
        max_tokens: request.max_tokens,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// OpenAI-compatible API backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create a backend from configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() || config.api_key.starts_with("${") {
            return Err(LlmError::Config(
                "API key is empty or unexpanded".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Request)?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let body = to_wire(&self.config, &request);

        let response = self
            .client
            .post(self.completions_url())
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(
                backend = %self.config.name,
                status = status.as_u16(),
                "LLM API returned an error"
            );
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: WireResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_request_shape() {
        let config = OpenAiConfig::deepseek("sk-test");
        let request = ChatRequest::new("classify these items")
            .with_system("JSON only")
            .with_max_tokens(1024);

        let wire = to_wire(&config, &request);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "JSON only");
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn test_wire_request_omits_empty_system() {
        let config = OpenAiConfig::deepseek("sk-test");
        let wire = to_wire(&config, &ChatRequest::new("hi"));
        assert_eq!(wire.messages.len(), 1);
        assert_eq!(wire.messages[0].role, "user");
    }

    #[test]
    fn test_new_rejects_unexpanded_key() {
        let config = OpenAiConfig::deepseek("${DEEPSEEK_API_KEY}");
        assert!(matches!(
            OpenAiBackend::new(config),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_completions_url() {
        let backend =
            OpenAiBackend::new(OpenAiConfig::deepseek("sk-test")).unwrap();
        assert_eq!(
            backend.completions_url(),
            "https://api.deepseek.com/chat/completions"
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"[]"}}]}"#;
        let parsed: WireResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("[]"));
    }
}
