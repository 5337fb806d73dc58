//! Process-wide operational log ring
//!
//! A bounded in-memory log backing the `/api/log` endpoint. Constructed once
//! at startup and passed by `Arc` into the components that record events; no
//! ambient global state.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::RingBuffer;

/// Default capacity of the operational log ring.
pub const LOG_RING_CAPACITY: usize = 1000;

/// Severity of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One operator-visible event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the event was recorded
    pub time: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
}

/// Lock-guarded log ring shared across the poll loops and HTTP handlers.
#[derive(Debug)]
pub struct LogRing {
    inner: RwLock<RingBuffer<LogEntry>>,
}

impl LogRing {
    /// Create a log ring with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(RingBuffer::new(capacity)),
        }
    }

    /// Record an event and mirror it to the tracing subscriber.
    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        self.inner.write().enqueue(LogEntry {
            time: Utc::now(),
            level,
            message,
        });
    }

    /// Record an informational event.
    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    /// Record a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message);
    }

    /// Record an error.
    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    /// Newest-first entries for display, truncated to `limit`.
    pub fn tail(&self, limit: usize) -> Vec<LogEntry> {
        let mut entries = self.inner.read().newest_to_oldest();
        entries.truncate(limit);
        entries
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True when nothing has been logged yet.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(LOG_RING_CAPACITY)
    }
}
