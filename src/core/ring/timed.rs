//! Time-windowed ring buffer variant
//!
//! Wait history keeps more context on disk than in memory; the in-memory
//! ring additionally trims its reads to a trailing wall-clock window so a
//! server that polls slowly does not surface hours-old snapshots.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::RingBuffer;

/// Implemented by samples that carry their capture time.
pub trait Timestamped {
    /// When this sample was captured.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Ring buffer whose reads filter to a trailing time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedRing<T> {
    ring: RingBuffer<T>,
    window_secs: i64,
}

impl<T> TimedRing<T> {
    /// Create an empty windowed ring.
    pub fn new(capacity: usize, window_secs: i64) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            window_secs,
        }
    }

    /// Fixed size of the backing store.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of stored elements, including any outside the window.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Width of the trailing window in seconds.
    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    /// Write a sample, evicting the oldest if full.
    pub fn enqueue(&mut self, value: T) {
        self.ring.enqueue(value);
    }

    /// Most recently enqueued sample, regardless of window.
    pub fn get_newest(&self) -> Option<&T> {
        self.ring.get_newest()
    }
}

impl<T: Timestamped + Clone> TimedRing<T> {
    /// Stored samples inside the trailing window, oldest to newest.
    pub fn values(&self) -> Vec<T> {
        self.values_at(Utc::now())
    }

    /// Window filtering relative to an explicit reference time.
    pub fn values_at(&self, now: DateTime<Utc>) -> Vec<T> {
        let cutoff = now - Duration::seconds(self.window_secs);
        self.ring
            .values()
            .into_iter()
            .filter(|v| v.timestamp() >= cutoff)
            .collect()
    }
}
