//! In-memory record of recently emitted log lines
//!
//! Every line the logger writes also lands here, so callers (and tests) can
//! inspect what was logged without re-reading the file.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Local};

use super::level::LogLevel;

/// A single emitted log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Timestamp when the message was emitted
    pub timestamp: DateTime<Local>,
    /// Log level
    pub level: LogLevel,
    /// Name of the logger that emitted it
    pub logger: String,
    /// Message as passed to the backend, before templating
    pub message: String,
}

impl LogEntry {
    /// Create a new log entry stamped with the current time
    pub fn new(level: LogLevel, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            logger: logger.into(),
            message: message.into(),
        }
    }
}

/// Thread-safe ring buffer of log entries
#[derive(Debug)]
pub struct LogBuffer {
    /// All entries (capped at max_entries)
    entries: RwLock<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl LogBuffer {
    /// Create a new log buffer holding at most `max_entries`
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    /// Push a new entry, evicting the oldest when full
    pub fn push(&self, entry: LogEntry) {
        if self.max_entries == 0 {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// All entries, oldest first
    pub fn all_entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }
}
