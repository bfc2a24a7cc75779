//! Tools manifest rendering — teaching the model what it can call.
//!
//! The manifest is embedded in the system prompt on every turn, so the
//! registry's `definitions()` keeps it stable across calls.

use sidekick_core::tool::ToolDefinition;

/// Render the textual tools manifest plus protocol usage instructions.
///
/// Returns an empty string when there are no tools, so callers can embed
/// the result unconditionally.
pub fn render_manifest(definitions: &[ToolDefinition]) -> String {
    if definitions.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Available tools\n\n");

    for def in definitions {
        out.push_str(&format!("### {}\n", def.name));
        out.push_str(&format!("{}\n", def.description));

        let properties = def
            .parameters
            .get("properties")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        out.push_str("Parameters:\n```json\n");
        out.push_str(&serde_json::to_string_pretty(&properties).unwrap_or_else(|_| "{}".into()));
        out.push_str("\n```\n");

        let required = def
            .parameters
            .get("required")
            .cloned()
            .unwrap_or_else(|| serde_json::json!([]));
        out.push_str(&format!("Required: {required}\n\n"));
    }

    out.push_str(
        "## Tool usage\n\n\
         To invoke a tool, reply with a line in exactly this format:\n\n\
         TOOL: tool_name | PARAMS: {\"parameter\": \"value\"}\n\n\
         Rules:\n\
         - PARAMS must be a single JSON object on the same line as the tool name.\n\
         - To invoke several tools in one reply, write one TOOL line per invocation.\n\
         - After the tool results come back, continue working step by step.\n\
         - When no tool is needed, answer normally without the TOOL marker.\n",
    );

    out
}
