//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the assistant the ability to act inside the
//! editor workspace: read and write files, list directories, run
//! terminal commands. Each is a capability behind a uniform interface.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request to execute a tool, extracted from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to execute
    pub name: String,

    /// Parameters as a JSON object
    pub parameters: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// The result of a tool execution (or non-execution).
///
/// Always produced — on success, on failure, and on rejection. Nothing is
/// ever thrown across the orchestration boundary; the failure is the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    /// Which tool this result belongs to
    pub tool_name: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// Output data on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error description on failure or rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecutionResult {
    /// A successful result carrying output data.
    pub fn ok(tool_name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failure record (execution error, rejection, unknown tool).
    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// A tool definition as presented to the model.
///
/// Rendered into the textual tools manifest embedded in the system
/// prompt, and passed to backends that support structured tool use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
///
/// Each tool (read_file, write_file, list_files, run_terminal, ...)
/// implements this trait. Tools are registered in the [`ToolRegistry`]
/// and made available to the orchestration loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolExecutionResult, ToolError>;

    /// Convert this tool into a definition for the manifest.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The orchestration loop uses this to:
/// 1. Get tool definitions for the manifest embedded in the system prompt
/// 2. Dispatch parsed tool calls to the right implementation
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, sorted by name for a stable manifest.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call, capturing every failure as a result record.
    ///
    /// This is the orchestration boundary: an unknown tool or a tool-level
    /// error comes back as a `ToolExecutionResult` with `success: false`,
    /// never as an `Err`.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolExecutionResult {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolExecutionResult::failure(
                &call.name,
                format!("Unknown tool '{}'", call.name),
            );
        };

        match tool.execute(call.parameters.clone()).await {
            Ok(result) => result,
            Err(e) => ToolExecutionResult::failure(&call.name, e.to_string()),
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
