//! End-to-end turn flow tests with a scripted backend.

use sidekick_config::{AppConfig, StaticConfigStore};
use sidekick_core::backend::{ModelBackend, ModelReply};
use sidekick_core::error::{BackendError, Error, ToolError};
use sidekick_core::message::Role;
use sidekick_core::tool::{Tool, ToolCall, ToolExecutionResult, ToolRegistry};
use sidekick_engine::testing::*;
use sidekick_engine::{ApprovalHandler, AutoApprove, AutoDeny, Orchestrator, Session};
use sidekick_retrieval::InMemoryIndex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A stand-in read_file tool that records executions.
struct StubReadFile {
    executions: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Tool for StubReadFile {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read a file"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"]
        })
    }
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolExecutionResult, ToolError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(ToolExecutionResult::ok(
            "read_file",
            serde_json::json!({
                "path": arguments["path"],
                "content": "export const x = 1;"
            }),
        ))
    }
}

fn registry_with_read_file(executions: &Arc<AtomicUsize>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(StubReadFile {
        executions: executions.clone(),
    }));
    tools
}

fn orchestrator_with(
    backend: Arc<dyn ModelBackend>,
    tools: ToolRegistry,
    config: AppConfig,
    approval: Arc<dyn ApprovalHandler>,
) -> Orchestrator {
    Orchestrator::new(
        backend,
        Arc::new(tools),
        Arc::new(StaticConfigStore::new(config)),
        approval,
    )
}

// ── Scenario A: plain chat, one model pass ────────────────────────────────

#[tokio::test]
async fn scenario_a_single_pass_chat() {
    let backend = Arc::new(SequentialMockBackend::single_text(
        "Hi! Ask me anything about your code.",
    ));
    let orch = orchestrator_with(
        backend.clone(),
        ToolRegistry::new(),
        AppConfig::default(),
        Arc::new(AutoDeny),
    );
    let session = Session::default();

    let outcome = orch.run_turn(&session, "hello").await.unwrap();
    assert_eq!(outcome.text, "Hi! Ask me anything about your code.");
    assert_eq!(backend.call_count(), 1);

    // The rendered prompt carried the system prompt and the user message
    let request = &backend.requests()[0];
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages.last().unwrap().content, "hello");
}

// ── Scenario B: level 3, safe tool runs without approval ──────────────────

#[tokio::test]
async fn scenario_b_safe_tool_executes_unattended() {
    let executions = Arc::new(AtomicUsize::new(0));
    let backend = Arc::new(SequentialMockBackend::new(vec![
        text_reply(r#"TOOL: read_file | PARAMS: {"path": "x.ts"}"#),
        text_reply("x.ts exports the constant x."),
    ]));

    // Level 3 with the approval handler wired to deny: if the gate asked,
    // the tool would never run.
    let orch = orchestrator_with(
        backend.clone(),
        registry_with_read_file(&executions),
        AppConfig::default(),
        Arc::new(AutoDeny),
    );
    let session = Session::default();

    let outcome = orch.run_turn(&session, "what does x.ts export?").await.unwrap();
    assert_eq!(outcome.text, "x.ts exports the constant x.");
    assert_eq!(outcome.iterations, 1);
    assert_eq!(executions.load(Ordering::SeqCst), 1);
    // The loop continued to a second model call automatically
    assert_eq!(backend.call_count(), 2);

    // The continuation call saw the folded tool results
    let continuation = &backend.requests()[1];
    let folded = continuation
        .messages
        .iter()
        .find(|m| m.content.starts_with("Tool results:"))
        .expect("folded tool results in the rendered prompt");
    assert!(folded.content.contains("export const x = 1;"));
}

// ── P7: iteration bound ───────────────────────────────────────────────────

#[tokio::test]
async fn p7_iteration_bound_cuts_runaway_loops() {
    // Every reply keeps asking for tools; the sixth is cut off.
    let replies: Vec<ModelReply> = (0..6)
        .map(|i| {
            calls_reply(
                &format!("Iteration {i}..."),
                vec![ToolCall::new("read_file", serde_json::json!({"path": "x"}))],
            )
        })
        .collect();

    let executions = Arc::new(AtomicUsize::new(0));
    let backend = Arc::new(SequentialMockBackend::new(replies));
    let orch = orchestrator_with(
        backend.clone(),
        registry_with_read_file(&executions),
        AppConfig::default(),
        Arc::new(AutoApprove),
    );
    let session = Session::default();

    let outcome = orch.run_turn(&session, "loop forever").await.unwrap();
    assert_eq!(outcome.iterations, 5);
    assert_eq!(backend.call_count(), 6);
    assert!(outcome.text.contains("Maximum tool-call iterations"));
    // Five iterations of one call each actually executed
    assert_eq!(executions.load(Ordering::SeqCst), 5);
}

// ── P2: summarization cadence ─────────────────────────────────────────────

#[tokio::test]
async fn p2_summary_triggers_once_after_ten_messages() {
    // Five plain turns append user+assistant = 10 messages. The sixth
    // turn first summarizes, then chats.
    let mut replies: Vec<ModelReply> = (0..5).map(|i| text_reply(&format!("reply {i}"))).collect();
    replies.push(text_reply("They worked through five questions about the parser."));
    replies.push(text_reply("reply 5"));

    let backend = Arc::new(SequentialMockBackend::new(replies));
    let orch = orchestrator_with(
        backend.clone(),
        ToolRegistry::new(),
        AppConfig::default(),
        Arc::new(AutoDeny),
    );
    let session = Session::default();

    for i in 0..5 {
        let _ = orch.run_turn(&session, &format!("question {i}")).await.unwrap();
    }
    assert_eq!(backend.call_count(), 5, "no summarization yet");

    let outcome = orch.run_turn(&session, "question 5").await.unwrap();
    assert_eq!(outcome.text, "reply 5");
    assert_eq!(backend.call_count(), 7, "exactly one extra call for the digest");

    let requests = backend.requests();
    // Call #6 was the digest request…
    assert!(requests[5].messages[0].content.contains("Summarize the conversation"));
    // …and call #7 carried the digest spliced right after the system prompt.
    assert_eq!(requests[6].messages[1].role, Role::System);
    assert!(requests[6].messages[1].content.contains("five questions about the parser"));

    // The digest itself never entered the persisted history.
    let history = session.history().await;
    assert!(
        history.iter().all(|e| !e.content.contains("five questions about the parser")),
        "summary must not be persisted"
    );
}

#[tokio::test]
async fn summarization_failure_never_blocks_the_turn() {
    // Backend that fails the digest call but answers the chat call.
    struct DigestFails {
        inner: SequentialMockBackend,
    }

    #[async_trait::async_trait]
    impl ModelBackend for DigestFails {
        fn name(&self) -> &str {
            "digest_fails"
        }
        async fn complete(
            &self,
            request: sidekick_core::backend::ModelRequest,
        ) -> Result<ModelReply, BackendError> {
            if request.messages[0].content.contains("Summarize the conversation") {
                return Err(BackendError::Unreachable("digest refused".into()));
            }
            self.inner.complete(request).await
        }
    }

    let replies: Vec<ModelReply> = (0..6).map(|i| text_reply(&format!("reply {i}"))).collect();
    let backend = Arc::new(DigestFails {
        inner: SequentialMockBackend::new(replies),
    });
    let orch = orchestrator_with(
        backend,
        ToolRegistry::new(),
        AppConfig::default(),
        Arc::new(AutoDeny),
    );
    let session = Session::default();

    for i in 0..6 {
        let outcome = orch.run_turn(&session, &format!("q{i}")).await.unwrap();
        assert_eq!(outcome.text, format!("reply {i}"));
    }
}

// ── Timeout ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn model_timeout_aborts_the_turn() {
    let mut config = AppConfig::default();
    config.turn.model_timeout_secs = 30;

    let orch = orchestrator_with(
        Arc::new(HangingBackend),
        ToolRegistry::new(),
        config,
        Arc::new(AutoDeny),
    );
    let session = Session::default();

    let err = orch.run_turn(&session, "hello").await.unwrap_err();
    match err {
        Error::Backend(BackendError::Timeout { timeout_secs }) => {
            assert_eq!(timeout_secs, 30);
        }
        other => panic!("expected timeout, got {other}"),
    }

    // The session is usable again after the failed turn.
    assert!(session.try_begin().is_ok());
}

// ── Retrieval augmentation ────────────────────────────────────────────────

#[tokio::test]
async fn retrieval_block_rides_the_rendered_prompt_only() {
    let index = Arc::new(InMemoryIndex::new());
    index
        .insert("src/auth.rs", "fn check_password(hash: &str) -> bool { todo!() }")
        .await;

    let backend = Arc::new(SequentialMockBackend::single_text(
        "check_password compares hashes.",
    ));
    let orch = orchestrator_with(
        backend.clone(),
        ToolRegistry::new(),
        AppConfig::default(),
        Arc::new(AutoDeny),
    )
    .with_index(index);
    let session = Session::default();

    let _ = orch
        .run_turn(&session, "how does check_password work?")
        .await
        .unwrap();

    let request = &backend.requests()[0];
    let n = request.messages.len();
    // The block sits immediately before the latest user message
    assert!(request.messages[n - 2].content.contains("Project memory"));
    assert!(request.messages[n - 2].content.contains("src/auth.rs"));
    assert_eq!(request.messages[n - 1].content, "how does check_password work?");

    // …and never lands in the persisted history
    let history = session.history().await;
    assert!(history.iter().all(|e| !e.content.contains("Project memory")));
}

#[tokio::test]
async fn retrieval_disabled_by_config() {
    let index = Arc::new(InMemoryIndex::new());
    index.insert("src/x.rs", "relevant content words").await;

    let mut config = AppConfig::default();
    config.retrieval.enabled = false;

    let backend = Arc::new(SequentialMockBackend::single_text("ok"));
    let orch = orchestrator_with(
        backend.clone(),
        ToolRegistry::new(),
        config,
        Arc::new(AutoDeny),
    )
    .with_index(index);
    let session = Session::default();

    let _ = orch.run_turn(&session, "relevant content words").await.unwrap();
    let request = &backend.requests()[0];
    assert!(request.messages.iter().all(|m| !m.content.contains("Project memory")));
}

// ── Structured tool-call channel ──────────────────────────────────────────

#[tokio::test]
async fn structured_calls_bypass_the_string_parser() {
    let executions = Arc::new(AtomicUsize::new(0));
    let backend = Arc::new(SequentialMockBackend::new(vec![
        // Text mentions the marker but the structured channel wins.
        calls_reply(
            "I could write TOOL: something here and it wouldn't matter.",
            vec![ToolCall::new("read_file", serde_json::json!({"path": "a.rs"}))],
        ),
        text_reply("done"),
    ]));

    let orch = orchestrator_with(
        backend,
        registry_with_read_file(&executions),
        AppConfig::default(),
        Arc::new(AutoApprove),
    );
    let session = Session::default();

    let outcome = orch.run_turn(&session, "read a.rs").await.unwrap();
    assert_eq!(outcome.tool_calls_made, 1);
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

// ── Config snapshot semantics ─────────────────────────────────────────────

#[tokio::test]
async fn unknown_tool_comes_back_as_failure_data() {
    let backend = Arc::new(SequentialMockBackend::new(vec![
        text_reply(r#"TOOL: teleport | PARAMS: {"to": "production"}"#),
        text_reply("That tool doesn't exist, sorry."),
    ]));

    let mut config = AppConfig::default();
    config.autonomy.level = 5;

    let orch = orchestrator_with(
        backend.clone(),
        ToolRegistry::new(),
        config,
        Arc::new(AutoApprove),
    );
    let session = Session::default();

    let outcome = orch.run_turn(&session, "teleport me").await.unwrap();
    assert_eq!(outcome.text, "That tool doesn't exist, sorry.");

    let continuation = &backend.requests()[1];
    let folded = continuation
        .messages
        .iter()
        .find(|m| m.content.starts_with("Tool results:"))
        .unwrap();
    assert!(folded.content.contains("Unknown tool"));
}
