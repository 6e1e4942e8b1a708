//! Bounded in-memory history of command executions.
//!
//! The history lives for one process invocation and is never persisted. It
//! keeps the most recent [`HISTORY_CAPACITY`] records in chronological order,
//! evicting the oldest first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum number of records retained.
pub const HISTORY_CAPACITY: usize = 100;

/// A single command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    /// When the execution finished.
    pub timestamp: DateTime<Utc>,

    /// Command name.
    pub command: String,

    /// IDE (or `cli`) that issued the command.
    pub source_ide: String,

    /// Whether the command succeeded.
    pub success: bool,

    /// Error message for failed executions.
    pub error: Option<String>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Chronological, capacity-bounded execution history.
#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    entries: VecDeque<ExecutionRecord>,
    capacity: usize,
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl ExecutionHistory {
    /// Create an empty history holding at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an execution, evicting the oldest record when full.
    pub fn record(&mut self, record: ExecutionRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no executions have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&ExecutionRecord> {
        self.entries.back()
    }

    /// Up to `n` most recent records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ExecutionRecord> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// All retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.entries.iter()
    }
}
