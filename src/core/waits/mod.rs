//! Wait-statistics accumulation
//!
//! Converts the cumulative wait-type counters a server reports each poll
//! into per-minute deltas, groups them into display categories, and retains
//! the snapshots in a time-windowed ring plus an append-only journal.

pub mod categories;
pub mod journal;

#[cfg(test)]
mod tests;

pub use categories::CategoryMap;
pub use journal::WaitJournal;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ring::{TimedRing, Timestamped};

/// Snapshots retained in memory per server.
pub const WAIT_RING_CAPACITY: usize = 60;

/// Trailing window applied when reading wait history, in seconds.
pub const WAIT_WINDOW_SECS: i64 = 61 * 60;

/// One wait type's raw cumulative time and derived per-minute delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitSample {
    /// Cumulative wait time as reported by the server, in milliseconds
    pub total_ms: i64,
    /// Delta normalized to per-minute over the poll interval; 0 when no
    /// prior value exists or the server reset, never negative
    pub delta_per_minute: f64,
}

/// One full capture of a server's wait statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitSnapshot {
    /// Key of the server this snapshot belongs to; also embedded in journal
    /// lines so replay can filter after globbing
    pub server_key: String,
    /// Capture time
    pub captured_at: DateTime<Utc>,
    /// Raw per-type values and deltas, retained even for excluded categories
    pub waits: HashMap<String, WaitSample>,
    /// Category → summed per-minute delta; excluded categories absent
    pub summary: BTreeMap<String, f64>,
}

impl Timestamped for WaitSnapshot {
    fn timestamp(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// Per-server accumulator over successive wait-stat captures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitAccumulator {
    ring: TimedRing<WaitSnapshot>,
    server_key: String,
}

impl WaitAccumulator {
    /// Create an empty accumulator for one server.
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            ring: TimedRing::new(WAIT_RING_CAPACITY, WAIT_WINDOW_SECS),
            server_key: server_key.into(),
        }
    }

    /// Snapshots inside the trailing window, oldest to newest.
    pub fn values(&self) -> Vec<WaitSnapshot> {
        self.ring.values()
    }

    /// Most recent snapshot regardless of window.
    pub fn newest(&self) -> Option<&WaitSnapshot> {
        self.ring.get_newest()
    }

    /// Pre-populate the ring from replayed journal snapshots.
    pub fn preload(&mut self, snapshots: Vec<WaitSnapshot>) {
        for snapshot in snapshots {
            self.ring.enqueue(snapshot);
        }
    }

    /// Record one capture of cumulative per-type wait times.
    ///
    /// Deltas require a prior snapshot holding the same wait type, a larger
    /// new value, elapsed wall time, and no reset this cycle; otherwise the
    /// delta is zero, never negative. Returns the snapshot so the caller can
    /// append it to the journal.
    pub fn record(
        &mut self,
        raw: HashMap<String, i64>,
        categories: &CategoryMap,
        reset: bool,
        now: DateTime<Utc>,
    ) -> WaitSnapshot {
        let previous = self.ring.get_newest();
        let elapsed_secs = previous
            .map(|p| (now - p.captured_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        let mut waits = HashMap::with_capacity(raw.len());
        for (wait_type, total_ms) in raw {
            let delta_per_minute = match previous.and_then(|p| p.waits.get(&wait_type)) {
                Some(prior)
                    if !reset && total_ms > prior.total_ms && elapsed_secs > 0.0 =>
                {
                    (total_ms - prior.total_ms) as f64 / elapsed_secs * 60.0
                }
                _ => 0.0,
            };
            waits.insert(
                wait_type,
                WaitSample {
                    total_ms,
                    delta_per_minute,
                },
            );
        }

        let summary = summarize(&waits, categories);
        let snapshot = WaitSnapshot {
            server_key: self.server_key.clone(),
            captured_at: now,
            waits,
            summary,
        };
        self.ring.enqueue(snapshot.clone());
        snapshot
    }
}

/// Category → summed per-minute delta for one snapshot. Types mapped to an
/// excluded category are dropped; unmapped types summarize under their own
/// name.
fn summarize(
    waits: &HashMap<String, WaitSample>,
    categories: &CategoryMap,
) -> BTreeMap<String, f64> {
    let mut summary = BTreeMap::new();
    for (wait_type, sample) in waits {
        if sample.delta_per_minute <= 0.0 {
            continue;
        }
        if let Some(category) = categories.resolve(wait_type) {
            *summary.entry(category.to_string()).or_insert(0.0) += sample.delta_per_minute;
        }
    }
    summary
}

/// Sum each category's delta across `snapshots` and return categories sorted
/// descending by total, ties broken alphabetically ascending, truncated to
/// `limit`. Used to pick the top-N series for charting.
pub fn top_groups(snapshots: &[WaitSnapshot], limit: usize) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for snapshot in snapshots {
        for (category, delta) in &snapshot.summary {
            *totals.entry(category.as_str()).or_insert(0.0) += delta;
        }
    }
    // BTreeMap iteration is already alphabetical, so a stable sort by
    // descending total keeps ties in ascending name order.
    let mut groups: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(name, total)| (name.to_string(), total))
        .collect();
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    groups.truncate(limit);
    groups
}
