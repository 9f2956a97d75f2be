//! LLM backend trait and the mock implementation used in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{LlmError, Result};

/// A single chat completion request: one system directive, one user prompt.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System message content; empty string omits it.
    pub system: String,
    /// User message content.
    pub prompt: String,
    /// Completion token budget.
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: String::new(),
            prompt: prompt.into(),
            max_tokens: 512,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for LLM providers.
///
/// Callers treat `complete` as an opaque `prompt -> text` call that may
/// fail; the classifier and insight engine both degrade gracefully when it
/// does.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the response text.
    async fn complete(&self, request: ChatRequest) -> Result<String>;

    /// Name of this backend, for logging.
    fn name(&self) -> &str;
}

/// A backend shared across tasks.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Disabled backend
// ─────────────────────────────────────────────────────────────────────────────

/// Backend used when no API key is configured.
///
/// Every call fails, so callers run on their rule-based fallbacks and the
/// daemon stays useful without network access to an LLM.
#[derive(Debug, Default)]
pub struct DisabledBackend;

#[async_trait]
impl LlmBackend for DisabledBackend {
    async fn complete(&self, _request: ChatRequest) -> Result<String> {
        Err(LlmError::Config("no LLM API key configured".to_string()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock backend
// ─────────────────────────────────────────────────────────────────────────────

/// Scripted backend for deterministic tests.
///
/// Responses are returned in order; requesting past the end is an error,
/// which exercises callers' fallback paths. All requests are recorded.
#[derive(Debug, Default)]
pub struct MockBackend {
    responses: std::sync::Mutex<Vec<Result<String>>>,
    request_log: std::sync::Mutex<Vec<ChatRequest>>,
}

impl MockBackend {
    /// A backend that returns the given texts, in order.
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: std::sync::Mutex::new(
                responses.into_iter().map(|r| Ok(r.to_string())).collect(),
            ),
            request_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A backend that returns a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            responses: std::sync::Mutex::new(vec![Ok(text.into())]),
            request_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A backend whose every call fails.
    pub fn failing() -> Self {
        Self {
            responses: std::sync::Mutex::new(Vec::new()),
            request_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// All requests made so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.request_log.lock().unwrap().clone()
    }

    /// Number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        self.request_log.lock().unwrap().push(request);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            ));
        }
        responses.remove(0)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
