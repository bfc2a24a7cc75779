//! Test doubles shared by unit, integration, and downstream tests.

use crate::approval::ApprovalHandler;
use async_trait::async_trait;
use sidekick_core::backend::{ModelBackend, ModelReply, ModelRequest, Usage};
use sidekick_core::error::BackendError;
use sidekick_core::tool::ToolCall;
use std::sync::Mutex;

/// A mock backend that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue and
/// records the request for inspection. Panics if more calls are made
/// than replies were scripted.
pub struct SequentialMockBackend {
    replies: Mutex<Vec<ModelReply>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl SequentialMockBackend {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A backend that returns a single text reply (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![text_reply(text)])
    }

    /// A backend that first requests tools, then gives a final answer.
    pub fn tool_then_answer(tool_calls: Vec<ToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![calls_reply(thought, tool_calls), text_reply(answer)])
    }

    /// How many completions have been served.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for SequentialMockBackend {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, BackendError> {
        let mut requests = self.requests.lock().unwrap();
        let mut replies = self.replies.lock().unwrap();

        if replies.is_empty() {
            panic!(
                "SequentialMockBackend: no more replies (call #{})",
                requests.len() + 1
            );
        }

        requests.push(request);
        Ok(replies.remove(0))
    }
}

/// A backend that always fails with the given error.
pub struct FailingBackend {
    error: BackendError,
}

impl FailingBackend {
    pub fn new(error: BackendError) -> Self {
        Self { error }
    }

    pub fn unreachable() -> Self {
        Self::new(BackendError::Unreachable("connection refused".into()))
    }
}

#[async_trait]
impl ModelBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ModelRequest) -> Result<ModelReply, BackendError> {
        Err(self.error.clone())
    }
}

/// A backend that never completes — for timeout and busy-guard tests.
pub struct HangingBackend;

#[async_trait]
impl ModelBackend for HangingBackend {
    fn name(&self) -> &str {
        "hanging_mock"
    }

    async fn complete(&self, _request: ModelRequest) -> Result<ModelReply, BackendError> {
        std::future::pending().await
    }
}

/// An approval handler with a fixed answer that records what it was
/// asked about.
pub struct RecordingApproval {
    decision: bool,
    asked: Mutex<Vec<String>>,
}

impl RecordingApproval {
    pub fn approving() -> Self {
        Self {
            decision: true,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn denying() -> Self {
        Self {
            decision: false,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Tool names this handler was asked about, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalHandler for RecordingApproval {
    async fn request(&self, tool_name: &str, _parameters: &serde_json::Value) -> bool {
        self.asked.lock().unwrap().push(tool_name.to_string());
        self.decision
    }
}

/// Build a plain text reply.
pub fn text_reply(text: &str) -> ModelReply {
    ModelReply {
        text: text.into(),
        tool_calls: Vec::new(),
        model: "mock-model".into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// Build a reply carrying structured tool calls.
pub fn calls_reply(text: &str, tool_calls: Vec<ToolCall>) -> ModelReply {
    ModelReply {
        tool_calls,
        ..text_reply(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidekick_core::message::PromptMessage;

    #[tokio::test]
    async fn mock_serves_replies_in_order() {
        let backend =
            SequentialMockBackend::new(vec![text_reply("first"), text_reply("second")]);
        let req = ModelRequest::new("m", vec![PromptMessage::user("x")]);

        assert_eq!(backend.complete(req.clone()).await.unwrap().text, "first");
        assert_eq!(backend.complete(req).await.unwrap().text, "second");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn recording_approval_tracks_questions() {
        let handler = RecordingApproval::denying();
        assert!(!handler.request("write_file", &serde_json::json!({})).await);
        assert_eq!(handler.asked(), vec!["write_file"]);
    }
}
