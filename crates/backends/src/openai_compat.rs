//! OpenAI-compatible backend implementation.
//!
//! Works with: LM Studio, Ollama, vLLM, OpenAI, OpenRouter, and any
//! other server exposing `/v1/chat/completions`.
//!
//! Native tool calls in the response are mapped onto the structured
//! [`ToolCall`] channel; servers without tool support simply return text
//! and the engine falls back to the string protocol parser.

use async_trait::async_trait;
use sidekick_core::backend::{ModelBackend, ModelReply, ModelRequest, Usage};
use sidekick_core::error::BackendError;
use sidekick_core::message::Role;
use sidekick_core::tool::ToolCall;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible model backend.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a new backend for an arbitrary endpoint.
    ///
    /// No request timeout is set on the client: the orchestration loop
    /// enforces its own per-call timeout, so a slow local model isn't
    /// cut off twice.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    /// An LM Studio backend (convenience constructor).
    pub fn lm_studio(base_url: Option<&str>) -> Self {
        Self::new(
            "lm_studio",
            base_url.unwrap_or("http://localhost:1234/v1"),
            None,
        )
    }

    /// An Ollama backend (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            None,
        )
    }

    fn to_api_messages(request: &ModelRequest) -> Vec<ApiMessage> {
        request
            .messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::System => "system".into(),
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                },
                content: m.content.clone(),
            })
            .collect()
    }

    fn to_api_tools(request: &ModelRequest) -> Option<Vec<ApiTool>> {
        if request.tools.is_empty() {
            return None;
        }
        Some(
            request
                .tools
                .iter()
                .map(|t| ApiTool {
                    r#type: "function".into(),
                    function: ApiFunctionDef {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    }

    fn map_request_error(e: reqwest::Error) -> BackendError {
        // The turn-level timeout lives in the orchestrator; any transport
        // failure here (refused, reset, connect timeout) means the server
        // isn't reachable.
        if e.is_connect() || e.is_timeout() {
            BackendError::Unreachable(e.to_string())
        } else {
            BackendError::Other(e.to_string())
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, BackendError> {
        let body = ApiRequest {
            model: request.model.clone(),
            messages: Self::to_api_messages(&request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: Self::to_api_tools(&request),
            stream: false,
        };

        debug!(
            backend = %self.name,
            model = %request.model,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let mut http = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status_code: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let choice = api
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("Response contained no choices".into()))?;

        let mut tool_calls = Vec::new();
        for tc in choice.message.tool_calls.unwrap_or_default() {
            match serde_json::from_str::<serde_json::Value>(&tc.function.arguments) {
                Ok(args @ serde_json::Value::Object(_)) => {
                    tool_calls.push(ToolCall::new(tc.function.name, args));
                }
                _ => {
                    warn!(tool = %tc.function.name, "Dropping tool call with unparseable arguments");
                }
            }
        }

        Ok(ModelReply {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: api.model.unwrap_or(request.model),
            usage: api.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let mut http = self.client.get(format!("{}/models", self.base_url));
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(Self::map_request_error)?;
        if !response.status().is_success() {
            return Err(BackendError::Api {
                status_code: response.status().as_u16(),
                message: "model listing failed".into(),
            });
        }

        let listing: ApiModelList = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(listing.data.into_iter().map(|m| m.id).collect())
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        Ok(self.list_models().await.is_ok())
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ApiTool {
    r#type: String,
    function: ApiFunctionDef,
}

#[derive(Serialize)]
struct ApiFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ApiModelList {
    data: Vec<ApiModel>,
}

#[derive(Deserialize)]
struct ApiModel {
    id: String,
}
