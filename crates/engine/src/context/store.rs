//! The persisted conversation history for one session.
//!
//! Invariants:
//! - Entry 0, once created, is always the system prompt; pruning never
//!   touches it (its content is refreshed per turn, not removed).
//! - Every entry's token count is computed once at construction and
//!   cached.
//!
//! The store lives in memory only. A process restart loses it; the only
//! persisted piece of the product is the autonomy/config file.

use crate::context::token::estimate_tokens;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sidekick_core::message::Role;
use tracing::debug;
use uuid::Uuid;

/// A single entry in the persisted history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry ID
    pub id: String,

    /// Who the entry is from
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the entry was appended
    pub timestamp: DateTime<Utc>,

    /// Cached token estimate, computed once
    pub token_count: usize,
}

impl HistoryEntry {
    fn new(role: Role, content: String) -> Self {
        let token_count = estimate_tokens(&content);
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
            token_count,
        }
    }
}

/// The ordered conversation history plus summary and budget state.
#[derive(Debug, Clone)]
pub struct ContextStore {
    entries: Vec<HistoryEntry>,
    summary: Option<String>,
    messages_since_last_summary: u32,
    max_context_tokens: usize,
    max_output_tokens: usize,
}

/// How many appends accumulate before the next turn summarizes.
pub const SUMMARY_CADENCE: u32 = 10;

/// Fraction of the context window reserved for history: 40%.
const HISTORY_BUDGET_NUMERATOR: usize = 2;
const HISTORY_BUDGET_DENOMINATOR: usize = 5;

impl ContextStore {
    /// Create an empty store with the given budgets.
    pub fn new(max_context_tokens: usize, max_output_tokens: usize) -> Self {
        Self {
            entries: Vec::new(),
            summary: None,
            messages_since_last_summary: 0,
            max_context_tokens,
            max_output_tokens,
        }
    }

    /// Refresh the budgets from the per-turn config snapshot.
    pub fn set_limits(&mut self, max_context_tokens: usize, max_output_tokens: usize) {
        self.max_context_tokens = max_context_tokens;
        self.max_output_tokens = max_output_tokens;
    }

    /// Append an entry, computing and caching its token estimate.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push(HistoryEntry::new(role, content.into()));
        self.messages_since_last_summary += 1;
    }

    /// Install or refresh the system prompt as entry 0.
    ///
    /// The system prompt does not count toward the summary cadence — it
    /// is engine plumbing, not conversation.
    pub fn set_system_prompt(&mut self, content: impl Into<String>) {
        let entry = HistoryEntry::new(Role::System, content.into());
        if self.entries.first().map(|e| e.role) == Some(Role::System) {
            self.entries[0] = entry;
        } else {
            self.entries.insert(0, entry);
        }
    }

    /// Drop the oldest non-system entries until the rest fit under
    /// `max_tokens`. Keeps entry 0 unconditionally and keeps exactly the
    /// suffix of remaining entries that fits. Returns how many entries
    /// were discarded.
    pub fn prune_to_fit(&mut self, max_tokens: usize) -> usize {
        if self.entries.len() <= 1 {
            return 0;
        }

        // Walk from most recent to oldest, accumulating cached counts.
        let mut kept_from = self.entries.len();
        let mut total = 0usize;
        for i in (1..self.entries.len()).rev() {
            let tokens = self.entries[i].token_count;
            if total + tokens < max_tokens {
                total += tokens;
                kept_from = i;
            } else {
                break;
            }
        }

        let dropped = kept_from.saturating_sub(1);
        if dropped > 0 {
            self.entries.drain(1..kept_from);
            debug!(dropped, kept_tokens = total, "Pruned old history entries");
        }
        dropped
    }

    /// The portion of the context window available to history: 40%.
    pub fn history_budget(&self) -> usize {
        self.max_context_tokens * HISTORY_BUDGET_NUMERATOR / HISTORY_BUDGET_DENOMINATOR
    }

    /// Whether enough messages accumulated to warrant a summary.
    pub fn needs_summary(&self) -> bool {
        self.messages_since_last_summary >= SUMMARY_CADENCE
    }

    /// Store a fresh digest and reset the cadence counter.
    ///
    /// The digest never enters `entries`; it is spliced into the
    /// rendered prompt instead, so it augments every later call without
    /// growing the history.
    pub fn store_summary(&mut self, digest: impl Into<String>) {
        self.summary = Some(digest.into());
        self.messages_since_last_summary = 0;
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn messages_since_last_summary(&self) -> u32 {
        self.messages_since_last_summary
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn max_context_tokens(&self) -> usize {
        self.max_context_tokens
    }

    pub fn max_output_tokens(&self) -> usize {
        self.max_output_tokens
    }

    /// Sum of cached token counts across all entries.
    pub fn total_tokens(&self) -> usize {
        self.entries.iter().map(|e| e.token_count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear everything: history, summary, and the cadence counter.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.summary = None;
        self.messages_since_last_summary = 0;
        debug!("Conversation reset");
    }
}
