//! Pluggable diagnostics sink.
//!
//! The machine reports what it does through a [`DiagnosticSink`] injected at
//! construction. Hosts choose where the text goes: nowhere ([`NoopSink`],
//! the default), the `tracing` ecosystem ([`TracingSink`]) or an in-memory
//! buffer ([`MemorySink`]).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Events dropped for lack of a matching transition
    Debug,
    /// Transitions and resets performed
    Info,
    /// Refused registrations
    Fault,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Fault => "fault",
        };
        f.write_str(name)
    }
}

/// Receiver of leveled text messages.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Forwards messages to `tracing`, tagged with a machine label.
///
/// `Fault` maps to `error!`.
#[derive(Clone, Debug)]
pub struct TracingSink {
    label: String,
}

impl TracingSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(format!("machine-{}", uuid::Uuid::new_v4()))
    }
}

impl DiagnosticSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(machine = %self.label, "{}", message),
            Level::Info => tracing::info!(machine = %self.label, "{}", message),
            Level::Fault => tracing::error!(machine = %self.label, "{}", message),
        }
    }
}

/// A message captured by [`MemorySink`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured records.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages logged at `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.level == level)
            .map(|record| record.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            at: Utc::now(),
        });
    }
}
