//! Fixed-capacity ring buffers for time-series retention
//!
//! Every metric series, wait-stat history, and the operational log are held
//! in bounded circular buffers: enqueueing never fails, the oldest element is
//! silently evicted on overflow, and readers get freshly allocated
//! chronological slices so they never alias the circular storage.

mod log;
mod timed;


pub use log::{LogEntry, LogLevel, LogRing, LOG_RING_CAPACITY};
pub use timed::{TimedRing, Timestamped};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Fixed-capacity circular store.
///
/// `head` is the index of the most recently written slot (-1 when empty) and
/// `tail` the oldest occupied slot. Iterating from `tail` forward (mod the
/// buffer length) through `head` visits the live elements oldest to newest.
/// The serialized shape `{buffer, head, tail, capacity}` is part of the wire
/// contract for the API and the on-disk snapshot cache; decoding restores the
/// exact indices so subsequent operations behave identically, and rejects
/// indices that do not describe a valid ring (a cached file is untrusted
/// input even when its JSON parses).
#[derive(Debug, Clone, Serialize)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    head: isize,
    tail: usize,
    capacity: usize,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RingBuffer<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Encoded<T> {
            buffer: Vec<T>,
            head: isize,
            tail: usize,
            capacity: usize,
        }

        let e = Encoded::deserialize(deserializer)?;
        if e.capacity == 0 || e.buffer.len() > e.capacity {
            return Err(D::Error::custom("ring buffer exceeds its capacity"));
        }
        if e.head < 0 {
            // the empty state is always a cleared buffer
            if e.head != -1 || e.tail != 0 || !e.buffer.is_empty() {
                return Err(D::Error::custom("empty ring with inconsistent indices"));
            }
        } else if e.head as usize >= e.buffer.len() || e.tail >= e.buffer.len() {
            return Err(D::Error::custom("ring indices out of range"));
        }
        Ok(Self {
            buffer: e.buffer,
            head: e.head,
            tail: e.tail,
            capacity: e.capacity,
        })
    }
}

impl<T> RingBuffer<T> {
    /// Create an empty ring with a fixed capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            head: -1,
            tail: 0,
            capacity,
        }
    }

    /// Fixed size of the backing store.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        if self.head < 0 {
            return 0;
        }
        let head = self.head as usize;
        if head >= self.tail {
            head - self.tail + 1
        } else {
            self.buffer.len() - self.tail + head + 1
        }
    }

    /// True when no live elements are stored.
    pub fn is_empty(&self) -> bool {
        self.head < 0
    }

    /// Write a value, evicting the oldest element if the ring is full.
    /// Always succeeds.
    pub fn enqueue(&mut self, value: T) {
        if self.head < 0 {
            // Dead slots from earlier dequeues are dropped here so the
            // buffer restarts dense.
            self.buffer.clear();
            self.buffer.push(value);
            self.head = 0;
            self.tail = 0;
            return;
        }
        if self.buffer.len() < self.capacity {
            // Still filling: storage has never wrapped, so append keeps
            // physical order equal to age order.
            self.buffer.push(value);
            self.head = (self.buffer.len() - 1) as isize;
            return;
        }
        let next = (self.head as usize + 1) % self.buffer.len();
        if next == self.tail {
            self.tail = (self.tail + 1) % self.buffer.len();
        }
        self.buffer[next] = value;
        self.head = next as isize;
    }

    /// Oldest live element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.head < 0 {
            return None;
        }
        self.buffer.get(self.tail)
    }

    /// Most recently enqueued element.
    pub fn get_newest(&self) -> Option<&T> {
        if self.head < 0 {
            return None;
        }
        self.buffer.get(self.head as usize)
    }
}

impl<T: Clone> RingBuffer<T> {
    /// All live elements, oldest to newest, in a newly allocated vector.
    pub fn values(&self) -> Vec<T> {
        if self.head < 0 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.len());
        let n = self.buffer.len();
        let mut i = self.tail;
        loop {
            out.push(self.buffer[i].clone());
            if i == self.head as usize {
                break;
            }
            i = (i + 1) % n;
        }
        out
    }

    /// All live elements, newest first. Used for log display.
    pub fn newest_to_oldest(&self) -> Vec<T> {
        let mut out = self.values();
        out.reverse();
        out
    }

    /// Remove and return the oldest element.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.head < 0 {
            return None;
        }
        let value = self.buffer[self.tail].clone();
        if self.tail == self.head as usize {
            self.head = -1;
            self.tail = 0;
            self.buffer.clear();
        } else {
            self.tail = (self.tail + 1) % self.buffer.len();
        }
        Some(value)
    }

    /// Resize the ring, renormalizing `head`/`tail` so `values()` is correct
    /// immediately afterwards. Shrinking keeps the newest `capacity`
    /// elements; growing preserves everything.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        let mut live = self.values();
        if live.len() > capacity {
            live.drain(..live.len() - capacity);
        }
        self.capacity = capacity;
        self.buffer = live;
        if self.buffer.is_empty() {
            self.head = -1;
            self.tail = 0;
        } else {
            self.tail = 0;
            self.head = (self.buffer.len() - 1) as isize;
        }
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(60)
    }
}
