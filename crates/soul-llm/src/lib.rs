//! LLM backend abstraction for soul-agent.
//!
//! The rest of the workspace sees one trait, [`LlmBackend`], whose
//! `complete` call turns a prompt into text and may fail. The production
//! implementation is [`OpenAiBackend`] (DeepSeek by default); tests use
//! [`MockBackend`].

pub mod backend;
pub mod error;
pub mod openai;

pub use backend::{ChatRequest, DisabledBackend, LlmBackend, MockBackend, SharedBackend};
pub use error::{LlmError, Result};
pub use openai::{OpenAiBackend, OpenAiConfig};
