//! The orchestration loop implementation.

use crate::approval::{self, ApprovalHandler};
use crate::augment::Augmentor;
use crate::context::store::ContextStore;
use crate::context::summarizer;
use crate::context::token::estimate_tokens;
use crate::context::render_prompt;
use crate::plan::{Plan, Planner, PlanningHints};
use crate::turn::{Session, TurnPhase};
use chrono::Utc;
use sidekick_config::{AppConfig, ConfigStore};
use sidekick_core::backend::{ModelBackend, ModelReply, ModelRequest};
use sidekick_core::error::{BackendError, Result};
use sidekick_core::event::{DomainEvent, EventBus};
use sidekick_core::message::{PromptMessage, Role};
use sidekick_core::retrieval::SnippetIndex;
use sidekick_core::tool::{ToolCall, ToolExecutionResult, ToolRegistry};
use sidekick_policy::{ApprovalAudit, GateOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fallback system prompt when the config doesn't override it.
const DEFAULT_SYSTEM_PROMPT: &str = "You are Sidekick, an AI pair-programming assistant \
embedded in a code editor. Help the user read, write, and improve the code in their \
workspace. Work step by step, and use the available tools when they help.";

/// Ephemeral instruction after an iteration's tool results are folded in.
const CONTINUATION_PROMPT: &str = "The tools have been executed and their results appear \
above. Continue working on the task step by step.";

/// Appended to the last reply when the iteration bound cuts a turn short.
const BOUND_EXCEEDED_SUFFIX: &str =
    "\n\n(Maximum tool-call iterations reached for this turn; stopping here.)";

/// Error recorded when the user (or the approval timeout) says no.
const REJECTION_ERROR: &str = "User rejected the tool execution.";

/// The outcome of one completed user turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The final assistant text
    pub text: String,

    /// Tool-call iterations performed (0 for a plain chat reply)
    pub iterations: usize,

    /// Total tool calls gated (executed or rejected)
    pub tool_calls_made: usize,

    /// The advisory plan, when the planning pass is enabled
    pub plan: Option<Plan>,
}

/// The orchestration engine: turns a user message into a bounded
/// sequence of model calls and tool executions.
pub struct Orchestrator {
    backend: Arc<dyn ModelBackend>,
    tools: Arc<ToolRegistry>,
    config_store: Arc<dyn ConfigStore>,
    approval: Arc<dyn ApprovalHandler>,
    index: Option<Arc<dyn SnippetIndex>>,
    events: Arc<EventBus>,
    audit: Arc<ApprovalAudit>,
    planning: bool,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        tools: Arc<ToolRegistry>,
        config_store: Arc<dyn ConfigStore>,
        approval: Arc<dyn ApprovalHandler>,
    ) -> Self {
        Self {
            backend,
            tools,
            config_store,
            approval,
            index: None,
            events: Arc::new(EventBus::default()),
            audit: Arc::new(ApprovalAudit::default()),
            planning: false,
        }
    }

    /// Attach a snippet index for retrieval augmentation.
    pub fn with_index(mut self, index: Arc<dyn SnippetIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Use a shared event bus instead of a private one.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Run the hidden planning pass before each turn.
    pub fn with_planning(mut self, enabled: bool) -> Self {
        self.planning = enabled;
        self
    }

    /// The gate decision log.
    pub fn audit(&self) -> &ApprovalAudit {
        &self.audit
    }

    /// Subscribe to turn progress events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run one user turn against a session.
    ///
    /// Returns [`Error::Busy`](sidekick_core::Error::Busy) immediately if
    /// a turn is already in flight for this session. Backend failures
    /// (no model, unreachable, timeout) propagate as typed errors; every
    /// failure inside the loop is folded into the conversation instead.
    pub async fn run_turn(&self, session: &Session, user_message: &str) -> Result<TurnOutcome> {
        let mut ctx = session.try_begin()?;

        self.events.publish(DomainEvent::TurnStarted {
            session_id: session.id().to_string(),
            timestamp: Utc::now(),
        });

        // One consistent snapshot for the whole turn.
        let cfg = self.config_store.load();

        match self.drive(&mut ctx, &cfg, user_message).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.events.publish(DomainEvent::ErrorOccurred {
                    context: "run_turn".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.phase(TurnPhase::Idle, 0);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        ctx: &mut ContextStore,
        cfg: &AppConfig,
        user_message: &str,
    ) -> Result<TurnOutcome> {
        self.phase(TurnPhase::Preparing, 0);

        ctx.set_limits(cfg.context.max_context_tokens, cfg.context.max_output_tokens());

        let base = cfg
            .system_prompt_override
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let manifest = sidekick_protocol::render_manifest(&self.tools.definitions());
        if manifest.is_empty() {
            ctx.set_system_prompt(base);
        } else {
            ctx.set_system_prompt(format!("{base}\n\n{manifest}"));
        }

        ctx.append(Role::User, user_message);

        let plan = if self.planning {
            let planner = Planner::new(self.backend.clone(), cfg.default_model.clone());
            Some(planner.create_plan(user_message, &PlanningHints::default()).await)
        } else {
            None
        };

        if ctx.needs_summary() {
            let digest =
                summarizer::generate_digest(ctx, self.backend.as_ref(), &cfg.default_model).await;
            if !digest.is_empty() {
                self.events.publish(DomainEvent::SummaryStored {
                    digest_chars: digest.len(),
                    timestamp: Utc::now(),
                });
                ctx.store_summary(digest);
            }
        }

        let dropped = ctx.prune_to_fit(ctx.history_budget());
        if dropped > 0 {
            self.events.publish(DomainEvent::ContextPruned {
                entries_dropped: dropped,
                timestamp: Utc::now(),
            });
        }

        // Retrieval augments the first model call of the turn; later
        // iterations carry the tool results instead.
        let retrieval_block = match (&self.index, cfg.retrieval.enabled) {
            (Some(index), true) => {
                Augmentor::new(index.clone(), cfg.retrieval.top_k)
                    .fetch_block(user_message)
                    .await
            }
            _ => None,
        };

        let mut iterations = 0usize;
        let mut tool_calls_made = 0usize;

        self.phase(TurnPhase::AwaitingModel, 0);
        let rendered = render_prompt(ctx, retrieval_block.as_deref());
        let mut reply = self.call_model(cfg, rendered).await?;

        let final_text = loop {
            self.phase(TurnPhase::ParsingTools, iterations);
            let calls = Self::extract_calls(&reply);

            if calls.is_empty() {
                break reply.text;
            }

            if iterations >= cfg.turn.max_tool_iterations {
                warn!(iterations, "Tool iteration bound reached, returning last reply");
                break format!("{}{}", reply.text, BOUND_EXCEEDED_SUFFIX);
            }
            iterations += 1;

            debug!(
                iteration = iterations,
                count = calls.len(),
                "Processing tool calls sequentially"
            );

            // Sequential on purpose: deterministic result ordering, and
            // side effects on shared resources (the filesystem) don't
            // interleave.
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                tool_calls_made += 1;
                results.push(self.gate_and_execute(cfg, call, iterations).await);
            }

            ctx.append(Role::User, fold_results(&results));

            // Keep the history window in budget before the next call too;
            // tool output can be large.
            let dropped = ctx.prune_to_fit(ctx.history_budget());
            if dropped > 0 {
                self.events.publish(DomainEvent::ContextPruned {
                    entries_dropped: dropped,
                    timestamp: Utc::now(),
                });
            }

            self.phase(TurnPhase::AwaitingModel, iterations);
            let mut rendered = render_prompt(ctx, None);
            rendered.push(PromptMessage::user(CONTINUATION_PROMPT));
            reply = self.call_model(cfg, rendered).await?;
        };

        let response_tokens = estimate_tokens(&final_text);
        if response_tokens * 10 > ctx.max_output_tokens() * 9 {
            warn!(
                response_tokens,
                budget = ctx.max_output_tokens(),
                "Model reply close to or over the output budget"
            );
        }

        ctx.append(Role::Assistant, final_text.clone());
        self.phase(TurnPhase::Idle, iterations);

        info!(iterations, tool_calls_made, "Turn completed");

        Ok(TurnOutcome {
            text: final_text,
            iterations,
            tool_calls_made,
            plan,
        })
    }

    /// Structured channel first; the string protocol is the fallback for
    /// backends without native tool use.
    fn extract_calls(reply: &ModelReply) -> Vec<ToolCall> {
        if !reply.tool_calls.is_empty() {
            reply.tool_calls.clone()
        } else {
            sidekick_protocol::parse_tool_calls(&reply.text)
        }
    }

    /// Pass one call through the approval gate and execute it.
    /// Every outcome — rejection included — comes back as a result record.
    async fn gate_and_execute(
        &self,
        cfg: &AppConfig,
        call: &ToolCall,
        iteration: usize,
    ) -> ToolExecutionResult {
        // Level 1 never executes and never asks.
        if cfg.autonomy.level == 1 {
            self.audit.record(
                &call.name,
                GateOutcome::Denied,
                "level 1 permits no tool execution",
            );
            return ToolExecutionResult::failure(
                &call.name,
                "Tool execution is disabled at autonomy level 1 (chat only).",
            );
        }

        let verdict = sidekick_policy::evaluate(&call.name, &call.parameters, &cfg.autonomy);

        if verdict.requires_approval {
            self.phase(TurnPhase::AwaitingApproval, iteration);
            let approved = approval::request_bounded(
                self.approval.as_ref(),
                &call.name,
                &call.parameters,
                cfg.approval.timeout_secs,
            )
            .await;

            self.events.publish(DomainEvent::ApprovalDecided {
                tool_name: call.name.clone(),
                approved,
                auto: false,
                timestamp: Utc::now(),
            });

            if !approved {
                info!(tool = %call.name, "Tool call rejected by the user");
                self.audit.record(&call.name, GateOutcome::Denied, &verdict.reason);
                return ToolExecutionResult::failure(&call.name, REJECTION_ERROR);
            }
            self.audit.record(&call.name, GateOutcome::Approved, &verdict.reason);
        } else {
            self.events.publish(DomainEvent::ApprovalDecided {
                tool_name: call.name.clone(),
                approved: true,
                auto: true,
                timestamp: Utc::now(),
            });
            self.audit
                .record(&call.name, GateOutcome::AutoApproved, &verdict.reason);
        }

        self.phase(TurnPhase::Executing, iteration);
        let start = std::time::Instant::now();
        let result = self.tools.dispatch(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.events.publish(DomainEvent::ToolExecuted {
            tool_name: call.name.clone(),
            success: result.success,
            duration_ms,
            timestamp: Utc::now(),
        });

        result
    }

    /// Call the backend with the turn's timeout. No retry: a timeout or
    /// transport failure ends the turn with a typed error.
    async fn call_model(
        &self,
        cfg: &AppConfig,
        messages: Vec<PromptMessage>,
    ) -> Result<ModelReply> {
        let mut request = ModelRequest::new(&cfg.default_model, messages);
        request.max_tokens = Some(cfg.context.max_output_tokens() as u32);
        request.tools = self.tools.definitions();

        let timeout_secs = cfg.turn.model_timeout_secs;
        match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.backend.complete(request),
        )
        .await
        {
            Ok(Ok(reply)) => {
                if let Some(usage) = &reply.usage {
                    self.events.publish(DomainEvent::ResponseGenerated {
                        model: reply.model.clone(),
                        tokens_used: usage.total_tokens,
                        timestamp: Utc::now(),
                    });
                }
                Ok(reply)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(BackendError::Timeout { timeout_secs }.into()),
        }
    }

    fn phase(&self, phase: TurnPhase, iteration: usize) {
        self.events.publish(DomainEvent::PhaseChanged {
            phase: phase.to_string(),
            iteration,
            timestamp: Utc::now(),
        });
    }
}

/// Concatenate one iteration's results into a single synthetic user
/// message, one JSON record per call.
fn fold_results(results: &[ToolExecutionResult]) -> String {
    let mut out = String::from("Tool results:\n");
    for result in results {
        let json =
            serde_json::to_string_pretty(result).unwrap_or_else(|_| "{\"success\":false}".into());
        out.push_str(&format!("\n[{}]\n{}\n", result.tool_name, json));
    }
    out
}
