//! Metric sample accumulation
//!
//! Turns successive polled counter values into per-interval deltas and
//! per-second rates, tolerant of counter resets, failed queries, and
//! missing rows. Each tracked metric keeps its own bounded ring of samples.


use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ring::RingBuffer;

/// Samples retained per metric; also the number of placeholder samples
/// backfilled when a metric is first seen, so chart x-axes are populated
/// from process start.
pub const METRIC_RING_CAPACITY: usize = 60;

/// How a polled value should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing counter; a rate is derived by differencing
    /// successive polls.
    Accumulating,
    /// Instantaneous value stored as-is, no rate.
    Gauge,
}

/// One polled sample of a named counter. Immutable once created; a new
/// sample is produced on every poll tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricValue {
    /// When the sample was taken
    pub event_time: DateTime<Utc>,
    /// Whether this poll actually returned usable data. Charts render a gap,
    /// not a zero, when false.
    pub polled: bool,
    /// Absolute counter value as reported by the source
    pub value: i64,
    /// Delta since the previous sample (0 unless computable)
    pub delta: i64,
    /// Per-second rate derived from the delta (0.0 unless computable)
    pub rate_per_sec: f64,
    /// Wall time between this and the previous sample, in milliseconds
    pub delta_duration_ms: i64,
}

impl MetricValue {
    /// Placeholder for a tick where the metric could not be polled.
    fn unpolled(event_time: DateTime<Utc>) -> Self {
        Self {
            event_time,
            polled: false,
            value: 0,
            delta: 0,
            rate_per_sec: 0.0,
            delta_duration_ms: 0,
        }
    }
}

/// Per-server accumulator owning one sample ring per metric name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricAccumulator {
    rings: HashMap<String, RingBuffer<MetricValue>>,
    /// When the accumulator last recorded any sample
    pub last_poll_time: Option<DateTime<Utc>>,
}

impl MetricAccumulator {
    /// Create an empty accumulator. Rings are lazily created per metric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all tracked metrics, unsorted.
    pub fn metric_names(&self) -> Vec<&str> {
        self.rings.keys().map(String::as_str).collect()
    }

    /// Samples for one metric, oldest to newest. Empty if never tracked.
    pub fn values(&self, metric: &str) -> Vec<MetricValue> {
        self.rings.get(metric).map(|r| r.values()).unwrap_or_default()
    }

    /// Most recent sample for one metric.
    pub fn newest(&self, metric: &str) -> Option<&MetricValue> {
        self.rings.get(metric).and_then(|r| r.get_newest())
    }

    /// Record one poll result for `metric`.
    ///
    /// `value` is `None` when the query failed or returned no rows; the tick
    /// is then recorded as an unpolled placeholder and absorbed here rather
    /// than failing the poll. `reset` suppresses delta/rate computation for
    /// this cycle (server identity or start time changed since last poll).
    pub fn record(
        &mut self,
        metric: &str,
        kind: MetricKind,
        value: Option<i64>,
        reset: bool,
        now: DateTime<Utc>,
    ) {
        let ring = self
            .rings
            .entry(metric.to_string())
            .or_insert_with(|| backfilled_ring(now));

        let sample = match value {
            None => MetricValue::unpolled(now),
            Some(raw) => match kind {
                MetricKind::Gauge => MetricValue {
                    event_time: now,
                    polled: true,
                    value: raw,
                    delta: 0,
                    rate_per_sec: 0.0,
                    delta_duration_ms: 0,
                },
                MetricKind::Accumulating => {
                    accumulate(ring.get_newest(), raw, reset, now)
                }
            },
        };

        ring.enqueue(sample);
        self.last_poll_time = Some(now);
    }
}

/// Compute the delta/rate sample for an accumulating counter.
///
/// A rate is only derived when the counter is actually accumulating: the
/// previous sample holds a positive value, the new value exceeds it, the
/// server has not just reset, and wall time has passed. Anything else is
/// recorded as an unpolled sample (chart gap) instead of a fabricated
/// zero or negative rate.
fn accumulate(
    previous: Option<&MetricValue>,
    raw: i64,
    reset: bool,
    now: DateTime<Utc>,
) -> MetricValue {
    let prev = match previous {
        Some(p) if p.value > 0 && !reset => p,
        _ => {
            return MetricValue {
                value: raw,
                polled: false,
                ..MetricValue::unpolled(now)
            }
        }
    };

    let elapsed_ms = (now - prev.event_time).num_milliseconds();
    let elapsed_secs = elapsed_ms as f64 / 1000.0;
    if raw <= prev.value || elapsed_secs <= 0.0 {
        return MetricValue {
            value: raw,
            polled: false,
            ..MetricValue::unpolled(now)
        };
    }

    let delta = raw - prev.value;
    MetricValue {
        event_time: now,
        polled: true,
        value: raw,
        delta,
        rate_per_sec: delta as f64 / elapsed_secs,
        delta_duration_ms: elapsed_ms,
    }
}

/// A fresh ring pre-populated with placeholder zero samples spaced one poll
/// interval apart, ending just before `now`.
fn backfilled_ring(now: DateTime<Utc>) -> RingBuffer<MetricValue> {
    let mut ring = RingBuffer::new(METRIC_RING_CAPACITY);
    for i in (1..=METRIC_RING_CAPACITY as i64).rev() {
        ring.enqueue(MetricValue::unpolled(
            now - Duration::seconds(i * crate::config::DEFAULT_POLL_INTERVAL_SECS as i64),
        ));
    }
    ring
}
