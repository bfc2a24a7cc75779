//! Approval audit — structured record of gate decisions.
//!
//! Every tool call that passes through the approval gate leaves a record
//! here, whether it was auto-approved, human-approved, or denied. The
//! buffer is bounded and in-memory: it exists for diagnostics panels and
//! tests, not for compliance storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// How a gated tool call was resolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Executed without asking
    AutoApproved,
    /// Human said yes
    Approved,
    /// Human said no, or the approval timed out
    Denied,
}

/// A single gate decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub outcome: GateOutcome,
    /// Which policy rule produced the verdict
    pub reason: String,
}

/// Bounded in-memory log of gate decisions.
pub struct ApprovalAudit {
    records: Mutex<VecDeque<AuditRecord>>,
    capacity: usize,
}

impl ApprovalAudit {
    /// Create an audit log holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a gate decision, evicting the oldest record when full.
    pub fn record(&self, tool_name: &str, outcome: GateOutcome, reason: &str) {
        let mut records = self.records.lock().unwrap();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(AuditRecord {
            timestamp: Utc::now(),
            tool_name: tool_name.into(),
            outcome,
            reason: reason.into(),
        });
    }

    /// All records, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().iter().cloned().collect()
    }

    /// Records with a given outcome.
    pub fn with_outcome(&self, outcome: GateOutcome) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.outcome == outcome)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl Default for ApprovalAudit {
    fn default() -> Self {
        Self::new(256)
    }
}
