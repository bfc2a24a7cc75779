//! Autonomy policy — how much the assistant may do without asking.
//!
//! The approval gate classifies every tool call as auto-executable or
//! approval-required, given the configured autonomy level and the
//! per-tool and per-command rules. The decision is pure and synchronous;
//! the engine owns the actual approval interaction.
//!
//! Autonomy levels:
//!
//! - **1 — Chat only**: no tool execution at all
//! - **2 — Suggestions**: every tool requires manual approval
//! - **3 — Balanced** (default): read-only/planning tools auto-execute,
//!   everything else requires approval
//! - **4 — Auto tools**: most tools auto-execute, dangerous commands gate
//! - **5 — Autonomous**: everything auto-executes except configured
//!   dangerous commands (the host should surface a persistent warning)

pub mod audit;
pub mod gate;

pub use audit::{ApprovalAudit, AuditRecord, GateOutcome};
pub use gate::{GateVerdict, evaluate, is_dangerous_command, level_description, requires_approval};
