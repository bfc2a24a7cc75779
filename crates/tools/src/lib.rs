//! Built-in tool implementations for Sidekick.
//!
//! These are the editor-side capabilities the assistant can invoke:
//! read and write workspace files, list directories, and run terminal
//! commands. Every file tool is scoped to a workspace root; whether a
//! call may run unattended is decided by the autonomy policy, not here.

pub mod list_files;
pub mod read_file;
pub mod run_terminal;
pub mod workspace;
pub mod write_file;

use sidekick_core::tool::ToolRegistry;
use std::path::PathBuf;

pub use workspace::WorkspaceRoot;

/// Create the default tool registry scoped to the given workspace root.
pub fn default_registry(workspace: impl Into<PathBuf>) -> ToolRegistry {
    let root = WorkspaceRoot::new(workspace);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(read_file::ReadFileTool::new(root.clone())));
    registry.register(Box::new(write_file::WriteFileTool::new(root.clone())));
    registry.register(Box::new(list_files::ListFilesTool::new(root.clone())));
    registry.register(Box::new(run_terminal::RunTerminalTool::new(root)));
    registry
}
