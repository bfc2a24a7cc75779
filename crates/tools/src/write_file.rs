//! Write file tool — create or overwrite workspace files.

use crate::workspace::WorkspaceRoot;
use async_trait::async_trait;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolExecutionResult};
use tracing::debug;

pub struct WriteFileTool {
    workspace: WorkspaceRoot,
}

impl WriteFileTool {
    pub fn new(workspace: WorkspaceRoot) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a workspace file. Creates the file (and parent directories) if needed, overwrites if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Workspace-relative path of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolExecutionResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = self.workspace.resolve(self.name(), path)?;

        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(ToolExecutionResult::failure(
                    self.name(),
                    format!("Failed to create parent directories for '{path}': {e}"),
                ));
            }
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => {
                debug!(path = %path, bytes = content.len(), "File written");
                Ok(ToolExecutionResult::ok(
                    self.name(),
                    serde_json::json!({ "path": path, "bytes_written": content.len() }),
                ))
            }
            Err(e) => Ok(ToolExecutionResult::failure(
                self.name(),
                format!("Failed to write '{path}': {e}"),
            )),
        }
    }
}
