//! Operator log: timestamped, append-only, newest first.

use std::collections::VecDeque;

use aquaflow_types::{LogEntry, LogLevel};
use chrono::Utc;

/// Maximum number of entries kept in memory. Older entries are dropped.
pub const MAX_LOG_ENTRIES: usize = 200;

/// Capped, newest-first list of [`LogEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
}

impl EventLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Prepend an entry stamped with the current time and return it.
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry {
            at: Utc::now(),
            level,
            message: message.into(),
        };
        self.entries.push_front(entry.clone());
        self.entries.truncate(MAX_LOG_ENTRIES);
        entry
    }

    /// Iterate entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Up to `limit` newest entries.
    pub fn latest(&self, limit: usize) -> Vec<LogEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
