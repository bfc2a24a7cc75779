//! ModelBackend trait — the abstraction over LLM inference servers.
//!
//! A backend knows how to send a rendered prompt to a model and get a
//! reply back. Implementations: OpenAI-compatible HTTP endpoints
//! (LM Studio, Ollama, vLLM, remote providers).
//!
//! The backend itself is fire-and-forget per request: timeouts are
//! enforced best-effort by the caller, and no retry policy exists
//! anywhere — every failure is terminal for that unit of work.

use crate::error::BackendError;
use crate::message::PromptMessage;
use crate::tool::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A request to a model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model identifier (e.g., "qwen2.5-coder-7b-instruct")
    pub model: String,

    /// The rendered prompt — system, history window, injected context
    pub messages: Vec<PromptMessage>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Tool definitions, for backends with a structured tool-use channel
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, messages: Vec<PromptMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: default_temperature(),
            tools: Vec::new(),
        }
    }
}

/// A complete reply from a model backend.
///
/// `tool_calls` is the structured output channel: backends that support
/// native tool use fill it directly, and the engine only falls back to
/// parsing `text` for the string protocol when it is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReply {
    /// The generated text
    pub text: String,

    /// Structured tool calls, if the backend produced them natively
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ModelReply {
    /// A plain text reply (used by mocks and fallbacks).
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            model: model.into(),
            usage: None,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core ModelBackend trait.
///
/// The orchestration loop calls `complete()` without knowing which
/// backend is active — pure polymorphism.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "lm_studio").
    fn name(&self) -> &str;

    /// Send a request and get a complete reply.
    async fn complete(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelReply, BackendError>;

    /// List available model identifiers on this backend.
    async fn list_models(&self) -> std::result::Result<Vec<String>, BackendError> {
        Ok(Vec::new())
    }

    /// Health check — can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, BackendError> {
        Ok(true)
    }
}
