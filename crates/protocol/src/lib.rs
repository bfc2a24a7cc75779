//! The textual tool protocol between Sidekick and unstructured models.
//!
//! Backends with native tool use return structured calls and never touch
//! this crate's parser. For everything else — local GGUF servers, plain
//! completion endpoints — tool invocations travel inline in the model's
//! free text:
//!
//! ```text
//! TOOL: write_file | PARAMS: {"path": "src/app.css", "content": "..."}
//! ```
//!
//! [`parser`] extracts calls from that text (model → engine direction);
//! [`manifest`] renders the tools manifest and usage instructions that
//! teach the model the format (engine → model direction).

pub mod manifest;
pub mod parser;

pub use manifest::render_manifest;
pub use parser::{PARAMS_MARKER, TOOL_MARKER, parse_tool_calls};
