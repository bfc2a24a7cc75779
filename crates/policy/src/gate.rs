//! The approval gate decision table.

use sidekick_config::AutonomyConfig;

/// Tools that stay auto-executable at level 3: read-only or planning.
const SAFE_TOOLS: &[&str] = &["read_file", "list_files", "plan_task"];

/// Tools that execute shell commands; their `command` parameter is
/// scanned for dangerous substrings.
const COMMAND_TOOLS: &[&str] = &["run_terminal"];

/// The outcome of evaluating the gate for one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateVerdict {
    /// Whether human approval is required before execution
    pub requires_approval: bool,

    /// Which rule produced the verdict (for the audit log)
    pub reason: String,
}

impl GateVerdict {
    fn gated(reason: impl Into<String>) -> Self {
        Self {
            requires_approval: true,
            reason: reason.into(),
        }
    }

    fn auto(reason: impl Into<String>) -> Self {
        Self {
            requires_approval: false,
            reason: reason.into(),
        }
    }
}

/// Evaluate the decision table for one tool call. First match wins:
///
/// 1. Level 1 → gated (the engine refuses execution entirely)
/// 2. Level 2 → gated
/// 3. Tool in `require_approval_tools` → gated
/// 4. Command tool with a dangerous substring → gated, at every level
/// 5. Tool in `auto_approve_tools` → auto
/// 6. Level 5 → auto
/// 7. Level 3 → auto only for the fixed safe set
/// 8. Level 4 → auto
/// 9. Anything else → gated (fail safe)
///
/// The dangerous-substring scan deliberately runs before the
/// auto-approve list and the level-5 shortcut, so a configured pattern
/// always gates regardless of level. It is a soft guard, not a sandbox.
pub fn evaluate(
    tool_name: &str,
    parameters: &serde_json::Value,
    config: &AutonomyConfig,
) -> GateVerdict {
    // Level 1: no tools allowed at all
    if config.level == 1 {
        return GateVerdict::gated("level 1 permits no tool execution");
    }

    // Level 2: everything needs manual approval
    if config.level == 2 {
        return GateVerdict::gated("level 2 requires approval for every tool");
    }

    if config.require_approval_tools.iter().any(|t| t == tool_name) {
        return GateVerdict::gated("tool is on the require-approval list");
    }

    if COMMAND_TOOLS.contains(&tool_name) {
        if let Some(command) = parameters.get("command").and_then(|c| c.as_str()) {
            if let Some(pattern) = dangerous_match(command, config) {
                return GateVerdict::gated(format!(
                    "command matches dangerous pattern '{pattern}'"
                ));
            }
        }
    }

    if config.auto_approve_tools.iter().any(|t| t == tool_name) {
        return GateVerdict::auto("tool is on the auto-approve list");
    }

    // Level 5: full autonomy
    if config.level == 5 {
        return GateVerdict::auto("level 5 auto-approves everything");
    }

    // Level 3: only the fixed safe set runs unattended
    if config.level == 3 {
        return if SAFE_TOOLS.contains(&tool_name) {
            GateVerdict::auto("read-only/planning tool at level 3")
        } else {
            GateVerdict::gated("level 3 gates non-safe tools")
        };
    }

    // Level 4: most tools auto-execute
    if config.level == 4 {
        return GateVerdict::auto("level 4 auto-approves non-dangerous tools");
    }

    GateVerdict::gated("no rule matched, failing safe")
}

/// Convenience wrapper returning just the boolean.
pub fn requires_approval(
    tool_name: &str,
    parameters: &serde_json::Value,
    config: &AutonomyConfig,
) -> bool {
    evaluate(tool_name, parameters, config).requires_approval
}

/// Case-insensitive substring scan of a command against the configured
/// dangerous patterns. Returns the first matching pattern.
fn dangerous_match<'a>(command: &str, config: &'a AutonomyConfig) -> Option<&'a str> {
    let lower = command.to_lowercase();
    config
        .dangerous_patterns
        .iter()
        .find(|p| lower.contains(&p.to_lowercase()))
        .map(|p| p.as_str())
}

/// Check whether a raw command string matches any dangerous pattern.
pub fn is_dangerous_command(command: &str, config: &AutonomyConfig) -> bool {
    dangerous_match(command, config).is_some()
}

/// A short human-readable description of an autonomy level.
pub fn level_description(level: u8) -> &'static str {
    match level {
        1 => "Chat only — no tool execution",
        2 => "Suggestions — manual approval for every tool",
        3 => "Balanced — safe tools auto, others require approval",
        4 => "Auto tools — most tools auto-execute",
        5 => "Autonomous — all tools auto-execute (use with caution)",
        _ => "Unknown",
    }
}
