//! Turn state and the single-flight session guard.
//!
//! One orchestration turn may be in flight per session. The guard is an
//! arena-of-one: the session's context store sits behind a mutex, and
//! beginning a turn is `try_lock` — a concurrent request gets
//! [`Error::Busy`](sidekick_core::Error::Busy) immediately instead of
//! queueing. Nothing else ever touches the store, so this is the only
//! mutual-exclusion mechanism in the engine.

use crate::context::store::ContextStore;
use serde::{Deserialize, Serialize};
use sidekick_core::error::Error;
use sidekick_core::message::SessionId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Where the state machine currently is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Preparing,
    AwaitingModel,
    ParsingTools,
    AwaitingApproval,
    Executing,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Preparing => "preparing",
            TurnPhase::AwaitingModel => "awaiting_model",
            TurnPhase::ParsingTools => "parsing_tools",
            TurnPhase::AwaitingApproval => "awaiting_approval",
            TurnPhase::Executing => "executing",
        };
        write!(f, "{s}")
    }
}

/// One conversation session: identity plus the guarded context store.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    store: Arc<Mutex<ContextStore>>,
}

impl Session {
    /// Create a session with the given context budgets. The budgets are
    /// refreshed from the config snapshot at the start of every turn.
    pub fn new(max_context_tokens: usize, max_output_tokens: usize) -> Self {
        Self {
            id: SessionId::new(),
            store: Arc::new(Mutex::new(ContextStore::new(
                max_context_tokens,
                max_output_tokens,
            ))),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Claim the session for one turn.
    ///
    /// Fails immediately with [`Error::Busy`] while another turn holds
    /// the guard; there is no queue.
    pub fn try_begin(&self) -> Result<OwnedMutexGuard<ContextStore>, Error> {
        self.store.clone().try_lock_owned().map_err(|_| Error::Busy)
    }

    /// Explicitly reset the conversation (waits for any active turn).
    pub async fn reset(&self) {
        self.store.lock().await.reset();
    }

    /// Number of persisted history entries.
    pub async fn history_len(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Clone the persisted history for display.
    pub async fn history(&self) -> Vec<crate::context::HistoryEntry> {
        self.store.lock().await.entries().to_vec()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(32_768, 8_192)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidekick_core::message::Role;

    #[test]
    fn second_begin_is_busy() {
        let session = Session::default();
        let guard = session.try_begin().unwrap();
        assert!(matches!(session.try_begin().unwrap_err(), Error::Busy));
        drop(guard);
        assert!(session.try_begin().is_ok());
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let session = Session::default();
        {
            let mut ctx = session.try_begin().unwrap();
            ctx.set_system_prompt("sys");
            ctx.append(Role::User, "hello");
        }
        assert_eq!(session.history_len().await, 2);
        session.reset().await;
        assert_eq!(session.history_len().await, 0);
    }

    #[test]
    fn phases_display_snake_case() {
        assert_eq!(TurnPhase::AwaitingModel.to_string(), "awaiting_model");
        assert_eq!(TurnPhase::Idle.to_string(), "idle");
    }
}
