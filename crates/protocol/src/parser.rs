//! Tool call extraction from free-form model text.
//!
//! The parameter block must be a JSON object, but models routinely embed
//! it in narrative text containing unrelated braces — inline CSS, code
//! snippets, shell expansions. A regex over the whole section would latch
//! onto the wrong closing brace, so parsing works by backtracking: take
//! the span from the first `{` to the *last* `}`, try to parse it, and on
//! failure pull the right boundary back to the previous `}` until a valid
//! object appears or the braces run out.

use sidekick_core::tool::ToolCall;
use tracing::{debug, warn};

/// Marker that opens a tool-call section.
pub const TOOL_MARKER: &str = "TOOL:";

/// Marker that separates the tool name from its parameter block.
pub const PARAMS_MARKER: &str = "PARAMS:";

/// Extract zero or more tool calls from model output, in source order.
///
/// Sections whose parameter block never yields a valid JSON object are
/// dropped and logged; they do not fail the parse.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCall> {
    // Fast path: no marker anywhere, nothing to scan.
    if !text.contains(TOOL_MARKER) {
        return Vec::new();
    }

    let mut calls = Vec::new();

    // The slice before the first marker is prose; skip it.
    for section in text.split(TOOL_MARKER).skip(1) {
        let Some((head, params_text)) = split_params(section) else {
            debug!("Tool section without a parameter marker, skipping");
            continue;
        };

        let Some(tool_name) = head.split_whitespace().next() else {
            warn!("Tool section with an empty tool name, skipping");
            continue;
        };

        match extract_object(params_text) {
            Some(parameters) => {
                debug!(tool = tool_name, "Parsed tool call");
                calls.push(ToolCall::new(tool_name, parameters));
            }
            None => {
                warn!(tool = tool_name, "Unparseable parameter block, section dropped");
            }
        }
    }

    calls
}

/// Split a section at `| PARAMS:` (tolerating whitespace around the
/// pipe), returning the name part and everything after the marker.
fn split_params(section: &str) -> Option<(&str, &str)> {
    for (idx, _) in section.match_indices('|') {
        let rest = section[idx + 1..].trim_start();
        if let Some(params) = rest.strip_prefix(PARAMS_MARKER) {
            return Some((&section[..idx], params));
        }
    }
    None
}

/// Find a valid JSON object in `text` by right-to-left backtracking over
/// closing braces.
fn extract_object(text: &str) -> Option<serde_json::Value> {
    let mut candidate = text;

    loop {
        let first = candidate.find('{')?;
        let last = candidate.rfind('}')?;
        if last <= first {
            return None;
        }

        let attempt = &candidate[first..=last];
        // Models sometimes wrap the block in a markdown fence.
        let cleaned = attempt.replace("```json", "").replace("```", "");

        match serde_json::from_str::<serde_json::Value>(cleaned.trim()) {
            Ok(value @ serde_json::Value::Object(_)) => return Some(value),
            // Parsed but not an object, or the trailing brace belonged to
            // something else entirely: shrink and retry.
            _ => candidate = &candidate[..last],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_marker_returns_empty() {
        let calls = parse_tool_calls("Just a normal reply with {braces} and | pipes.");
        assert!(calls.is_empty());
    }

    #[test]
    fn single_call_parses() {
        let text = r#"I'll read that file.

TOOL: read_file | PARAMS: {"path": "src/main.rs"}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].parameters["path"], "src/main.rs");
    }

    #[test]
    fn backtracks_past_unrelated_trailing_brace() {
        // The CSS block after the JSON must not confuse the parser.
        let text = r#"TOOL: write_file | PARAMS: {"path":"a.css"} .foo{color:red} more text"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "write_file");
        assert_eq!(
            calls[0].parameters,
            serde_json::json!({"path": "a.css"})
        );
    }

    #[test]
    fn multiple_calls_keep_source_order() {
        let text = r#"First:
TOOL: read_file | PARAMS: {"path": "a.ts"}
then:
TOOL: write_file | PARAMS: {"path": "b.ts", "content": "x"}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[1].name, "write_file");
    }

    #[test]
    fn unparseable_section_is_dropped_not_fatal() {
        let text = r#"TOOL: read_file | PARAMS: not json at all
TOOL: list_files | PARAMS: {"path": "src"}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "list_files");
    }

    #[test]
    fn fenced_json_is_cleaned() {
        let text = "TOOL: run_terminal | PARAMS: ```json\n{\"command\": \"ls\"}\n```";
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters["command"], "ls");
    }

    #[test]
    fn tolerates_tight_pipe_spacing() {
        let text = r#"TOOL: read_file |PARAMS: {"path": "x.rs"}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters["path"], "x.rs");
    }

    #[test]
    fn nested_objects_parse_whole() {
        let text = r#"TOOL: write_file | PARAMS: {"path": "c.json", "content": {"a": {"b": 1}}}"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters["content"]["a"]["b"], 1);
    }

    #[test]
    fn non_object_params_rejected() {
        // A bare array is valid JSON but not a parameter object.
        let text = r#"TOOL: read_file | PARAMS: ["not", "an", "object"]"#;
        let calls = parse_tool_calls(text);
        assert!(calls.is_empty());
    }

    #[test]
    fn section_without_params_marker_skipped() {
        let text = "TOOL: read_file the file please";
        let calls = parse_tool_calls(text);
        assert!(calls.is_empty());
    }

    #[test]
    fn prose_between_calls_ignored() {
        let text = r#"Let me check the styles first.

TOOL: read_file | PARAMS: {"path": "app.css"}

The rule .header{margin:0} looks wrong, rewriting:

TOOL: write_file | PARAMS: {"path": "app.css", "content": ".header{margin:8px}"}
Done."#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].parameters["content"], ".header{margin:8px}");
    }
}
