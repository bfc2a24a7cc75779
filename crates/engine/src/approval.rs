//! Approval handling — the human side of the approval gate.
//!
//! The handler may suspend for as long as the user takes to answer, so
//! the engine bounds every request with a timeout and treats elapse as a
//! denial. A host that guarantees an answer can disable the bound with a
//! timeout of zero.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Asks the human whether a gated tool call may execute.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Return `true` to execute, `false` to reject. May suspend pending
    /// user interaction.
    async fn request(&self, tool_name: &str, parameters: &serde_json::Value) -> bool;
}

/// Approves everything. For tests and fully trusted hosts.
pub struct AutoApprove;

#[async_trait]
impl ApprovalHandler for AutoApprove {
    async fn request(&self, _tool_name: &str, _parameters: &serde_json::Value) -> bool {
        true
    }
}

/// Denies everything. The safe default when no interactive host is
/// attached.
pub struct AutoDeny;

#[async_trait]
impl ApprovalHandler for AutoDeny {
    async fn request(&self, _tool_name: &str, _parameters: &serde_json::Value) -> bool {
        false
    }
}

/// Ask the handler, bounded by `timeout_secs` (0 = unbounded).
/// A timed-out request counts as a denial.
pub async fn request_bounded(
    handler: &dyn ApprovalHandler,
    tool_name: &str,
    parameters: &serde_json::Value,
    timeout_secs: u64,
) -> bool {
    if timeout_secs == 0 {
        return handler.request(tool_name, parameters).await;
    }

    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        handler.request(tool_name, parameters),
    )
    .await
    {
        Ok(decision) => decision,
        Err(_) => {
            warn!(
                tool = tool_name,
                timeout_secs, "Approval request timed out, denying"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A handler that never answers.
    struct HungHandler;

    #[async_trait]
    impl ApprovalHandler for HungHandler {
        async fn request(&self, _tool_name: &str, _parameters: &serde_json::Value) -> bool {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn auto_approve_says_yes() {
        let decision =
            request_bounded(&AutoApprove, "write_file", &serde_json::json!({}), 5).await;
        assert!(decision);
    }

    #[tokio::test]
    async fn auto_deny_says_no() {
        let decision = request_bounded(&AutoDeny, "write_file", &serde_json::json!({}), 5).await;
        assert!(!decision);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_handler_times_out_to_denial() {
        let decision =
            request_bounded(&HungHandler, "run_terminal", &serde_json::json!({}), 30).await;
        assert!(!decision);
    }
}
