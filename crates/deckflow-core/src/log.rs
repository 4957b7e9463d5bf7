//! Append-only, time-stamped user-facing log.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Severity of one console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Progress information.
    Info,
    /// A step completed.
    Success,
    /// Non-blocking problem.
    Warning,
    /// Failed action.
    Error,
}

impl Severity {
    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// `HH:MM:SS` (UTC) at append time.
    pub timestamp: String,
    /// Entry severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.timestamp, self.severity, self.message)
    }
}

/// Process-wide handle to the console log.
///
/// Clones share the same entry list, so a detached cleanup task can append to
/// the log the workflow owns.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry and mirrors it to `tracing`.
    pub fn push(&self, severity: Severity, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry {
            timestamp: timestamp_clock_utc(),
            severity,
            message: message.into(),
        };

        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(severity = %severity, "{}", entry.message)
            }
            Severity::Warning => tracing::warn!("{}", entry.message),
            Severity::Error => tracing::error!("{}", entry.message),
        }

        self.lock().push(entry.clone());
        entry
    }

    /// Appends an info entry.
    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.push(Severity::Info, message)
    }

    /// Appends a success entry.
    pub fn success(&self, message: impl Into<String>) -> LogEntry {
        self.push(Severity::Success, message)
    }

    /// Appends a warning entry.
    pub fn warning(&self, message: impl Into<String>) -> LogEntry {
        self.push(Severity::Warning, message)
    }

    /// Appends an error entry.
    pub fn error(&self, message: impl Into<String>) -> LogEntry {
        self.push(Severity::Error, message)
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<LogEntry> {
        self.lock().last().cloned()
    }

    /// Number of entries with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.lock()
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when the sink holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry. Only an explicit user action calls this.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic elsewhere while holding the lock leaves the list intact.
    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn timestamp_clock_utc() -> String {
    let now = OffsetDateTime::now_utc();
    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
}
