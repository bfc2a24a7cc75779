//! Error types for the Sidekick domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Propagation policy: anything recoverable inside a turn (tool failure,
//! approval rejection, unparseable tool section, summarization failure)
//! is converted into data flowing back into the model's next iteration.
//! Only backend-level failures and the busy guard surface as typed errors
//! to the orchestration caller.

use thiserror::Error;

/// The top-level error type for all Sidekick operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Concurrency guard ---
    #[error("A turn is already in flight for this session")]
    Busy,

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("No active model configured")]
    NoActiveModel,

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Model call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Malformed backend response: {0}")]
    InvalidResponse(String),

    #[error("Backend error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Permission denied: {tool_name} — {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_correctly() {
        let err = Error::Backend(BackendError::Api {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn timeout_reports_duration() {
        let err = BackendError::Timeout { timeout_secs: 300 };
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::PermissionDenied {
            tool_name: "run_terminal".into(),
            reason: "path outside workspace".into(),
        });
        assert!(err.to_string().contains("run_terminal"));
        assert!(err.to_string().contains("workspace"));
    }

    #[test]
    fn busy_is_its_own_variant() {
        assert!(matches!(Error::Busy, Error::Busy));
        assert!(Error::Busy.to_string().contains("in flight"));
    }
}
