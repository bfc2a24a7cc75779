//! The agent orchestration loop — the heart of Sidekick.
//!
//! A user message becomes a bounded, auditable sequence of model calls
//! and tool executions:
//!
//! 1. **Prepare** — snapshot the config, refresh the system prompt,
//!    append the message, summarize and prune, fetch retrieval context
//! 2. **Call the model** — with a per-call timeout
//! 3. **Parse tool calls** — structured channel first, string protocol
//!    as fallback
//! 4. **Gate and execute** — each call passes the autonomy policy, maybe
//!    an approval prompt, then runs sequentially
//! 5. **Fold results** back into history and loop, at most five times
//!
//! The loop continues until the model responds with no tool calls or the
//! iteration bound is reached. One turn per session at a time; a
//! concurrent request is rejected immediately.

pub mod approval;
pub mod augment;
pub mod context;
pub mod orchestrator;
pub mod plan;
pub mod testing;
pub mod turn;

pub use approval::{ApprovalHandler, AutoApprove, AutoDeny};
pub use augment::Augmentor;
pub use context::{ContextStore, HistoryEntry, render_prompt};
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use plan::{Plan, PlanIntent, Planner, PlanningHints};
pub use turn::{Session, TurnPhase};
