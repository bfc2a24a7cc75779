//! Run terminal tool — execute shell commands in the workspace.
//!
//! Whether a command may run unattended is the autonomy policy's call;
//! this tool only executes and captures. The working directory is pinned
//! to the workspace root.

use crate::workspace::WorkspaceRoot;
use async_trait::async_trait;
use sidekick_core::error::ToolError;
use sidekick_core::tool::{Tool, ToolExecutionResult};
use tokio::process::Command;
use tracing::{debug, warn};

pub struct RunTerminalTool {
    workspace: WorkspaceRoot,
}

impl RunTerminalTool {
    pub fn new(workspace: WorkspaceRoot) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for RunTerminalTool {
    fn name(&self) -> &str {
        "run_terminal"
    }

    fn description(&self) -> &str {
        "Execute a terminal command in the workspace and return stdout, stderr, and the exit code."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolExecutionResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        debug!(command = %command, "Executing terminal command");

        let output = if cfg!(target_os = "windows") {
            Command::new("cmd")
                .args(["/C", command])
                .current_dir(self.workspace.path())
                .output()
                .await
        } else {
            Command::new("sh")
                .args(["-c", command])
                .current_dir(self.workspace.path())
                .output()
                .await
        };

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let success = output.status.success();
                let exit_code = output.status.code().unwrap_or(-1);

                if !success {
                    warn!(command = %command, exit_code, "Command failed");
                }

                let data = serde_json::json!({
                    "stdout": stdout,
                    "stderr": stderr,
                    "exit_code": exit_code,
                });

                Ok(if success {
                    ToolExecutionResult::ok(self.name(), data)
                } else {
                    ToolExecutionResult {
                        tool_name: self.name().into(),
                        success: false,
                        data: Some(data),
                        error: Some(format!("Command exited with code {exit_code}")),
                    }
                })
            }
            Err(e) => Ok(ToolExecutionResult::failure(
                self.name(),
                format!("Failed to spawn command: {e}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> RunTerminalTool {
        let dir = std::env::temp_dir();
        RunTerminalTool::new(WorkspaceRoot::new(dir))
    }

    #[tokio::test]
    async fn execute_echo() {
        let result = tool()
            .execute(serde_json::json!({"command": "echo hello"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["stdout"], "hello");
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        let result = tool()
            .execute(serde_json::json!({"command": "exit 3"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.data.unwrap()["exit_code"], 3);
        assert!(result.error.unwrap().contains("3"));
    }

    #[tokio::test]
    async fn stderr_is_captured() {
        let result = tool()
            .execute(serde_json::json!({"command": "echo oops 1>&2"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["stderr"], "oops");
    }

    #[tokio::test]
    async fn missing_command_rejected() {
        let err = tool().execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
