//! Read file tool — read workspace file contents.

use crate::workspace::WorkspaceRoot;
use async_trait::async_trait;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolExecutionResult};

pub struct ReadFileTool {
    workspace: WorkspaceRoot,
}

impl ReadFileTool {
    pub fn new(workspace: WorkspaceRoot) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Workspace-relative path of the file to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolExecutionResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let resolved = self.workspace.resolve(self.name(), path)?;

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(ToolExecutionResult::ok(
                self.name(),
                serde_json::json!({ "path": path, "content": content }),
            )),
            Err(e) => Ok(ToolExecutionResult::failure(
                self.name(),
                format!("Failed to read '{path}': {e}"),
            )),
        }
    }
}
