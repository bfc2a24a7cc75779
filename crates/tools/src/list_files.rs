//! List files tool — non-recursive directory listing.

use crate::workspace::WorkspaceRoot;
use async_trait::async_trait;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolExecutionResult};

pub struct ListFilesTool {
    workspace: WorkspaceRoot,
}

impl ListFilesTool {
    pub fn new(workspace: WorkspaceRoot) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List the entries of a workspace directory (non-recursive)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Workspace-relative directory to list; defaults to the workspace root"
                }
            },
            "required": []
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolExecutionResult, ToolError> {
        let path = arguments["path"].as_str().unwrap_or(".");
        let resolved = self.workspace.resolve(self.name(), path)?;

        let mut read_dir = match tokio::fs::read_dir(&resolved).await {
            Ok(rd) => rd,
            Err(e) => {
                return Ok(ToolExecutionResult::failure(
                    self.name(),
                    format!("Failed to list '{path}': {e}"),
                ));
            }
        };

        let mut entries = Vec::new();
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            entries.push(serde_json::json!({ "name": name, "dir": is_dir }));
        }

        // Directory iteration order is filesystem-dependent; keep the
        // output stable for the model.
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(ToolExecutionResult::ok(
            self.name(),
            serde_json::json!({ "path": path, "entries": entries }),
        ))
    }
}
