//! Per-server polling scheduler
//!
//! One independent task per monitored server: a fixed 10-second tick drives
//! a cheap quick poll (identity, properties, availability groups) every
//! cycle and a full metric collection roughly once a minute. Polls never
//! overlap for one server, carry a cooperative wall-clock budget, and a
//! panic in one server's loop never disturbs the others.


use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::Utc;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{watch, Notify};
use tracing::debug;

use crate::core::metrics::MetricKind;
use crate::core::registry::state::{ServerState, PRIORITY_FAILED, PRIORITY_OK};
use crate::core::ring::LogRing;
use crate::core::sql::SqlExecutor;
use crate::core::waits::{CategoryMap, WaitJournal};
use crate::utils::error::{MonitorError, Result};

/// Counters collected on every big poll. The SQL text behind each name is
/// owned by the execution layer; the scheduler only stores the results.
pub const TRACKED_METRICS: &[(&str, MetricKind)] = &[
    ("cpu_percent", MetricKind::Gauge),
    ("batch_requests", MetricKind::Accumulating),
    ("sql_compilations", MetricKind::Accumulating),
    ("page_reads", MetricKind::Accumulating),
    ("page_writes", MetricKind::Accumulating),
    ("lock_waits", MetricKind::Accumulating),
    ("user_connections", MetricKind::Gauge),
    ("page_life_expectancy", MetricKind::Gauge),
];

/// Cadence and budget knobs for one scheduler.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Seconds between ticks
    pub poll_interval_secs: u64,
    /// Minimum seconds between big polls (a reset forces one regardless)
    pub big_poll_secs: i64,
    /// Whole-poll wall-clock budget, checked cooperatively between steps
    pub poll_budget_secs: u64,
    /// Hard deadline applied to each individual executor call
    pub step_timeout_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            big_poll_secs: 51,
            poll_budget_secs: 120,
            step_timeout_secs: 60,
        }
    }
}

/// Cooperative elapsed-time budget for one poll cycle. Checks run between
/// steps; a step already blocked past the budget is bounded only by its own
/// call-site timeout.
#[derive(Debug)]
pub struct PollBudget {
    started: Instant,
    budget: StdDuration,
}

impl PollBudget {
    /// Start the clock.
    pub fn new(budget_secs: u64) -> Self {
        Self {
            started: Instant::now(),
            budget: StdDuration::from_secs(budget_secs),
        }
    }

    /// Abort the cycle when the budget is exhausted.
    pub fn check(&self) -> Result<()> {
        let elapsed = self.started.elapsed();
        if elapsed > self.budget {
            return Err(MonitorError::PollTimeout {
                elapsed_secs: elapsed.as_secs(),
                budget_secs: self.budget.as_secs(),
            });
        }
        Ok(())
    }
}

/// Polling loop for one server. Owned by the registry entry; shares the
/// server's state lock and executor slot with it.
pub struct PollScheduler {
    key: String,
    state: Arc<RwLock<ServerState>>,
    executor: Arc<RwLock<Arc<dyn SqlExecutor>>>,
    categories: Arc<RwLock<CategoryMap>>,
    journal: WaitJournal,
    settings: PollSettings,
    log: Arc<LogRing>,
    cache_dir: Option<PathBuf>,
}

impl PollScheduler {
    /// Wire up a scheduler for one server.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        state: Arc<RwLock<ServerState>>,
        executor: Arc<RwLock<Arc<dyn SqlExecutor>>>,
        categories: Arc<RwLock<CategoryMap>>,
        journal: WaitJournal,
        settings: PollSettings,
        log: Arc<LogRing>,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            key: key.into(),
            state,
            executor,
            categories,
            journal,
            settings,
            log,
            cache_dir,
        }
    }

    /// Run until the stop signal fires. An in-flight poll finishes before
    /// the loop exits. `repoll` triggers an out-of-band cycle, used when a
    /// connection string is updated.
    pub async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>, repoll: Arc<Notify>) {
        debug!("[{}] poll loop starting", self.key);

        // Immediate connectivity/identity check, then a keyed jitter before
        // the first full collection so a restart does not open connections
        // to the whole fleet at once.
        self.poll_once(true).await;
        let jitter = jitter_secs(&self.key, self.settings.poll_interval_secs);
        tokio::select! {
            _ = tokio::time::sleep(StdDuration::from_secs(jitter)) => {}
            _ = stop.changed() => {
                debug!("[{}] poll loop stopped during startup jitter", self.key);
                return;
            }
        }

        let mut interval =
            tokio::time::interval(StdDuration::from_secs(self.settings.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => self.poll_once(false).await,
                _ = repoll.notified() => self.poll_once(false).await,
                _ = stop.changed() => break,
            }
        }
        debug!("[{}] poll loop stopped", self.key);
    }

    /// One scheduler tick: skip if a poll is still in flight, otherwise run
    /// a cycle with panic containment at this boundary.
    pub async fn poll_once(&self, quick_only: bool) {
        {
            let mut state = self.state.write();
            state.ticks += 1;
            if state.polling {
                state.skipped_ticks += 1;
                debug!("[{}] poll still in flight, skipping tick", self.key);
                return;
            }
            state.polling = true;
            state.polls += 1;
            state.poll_start = Some(Utc::now());
        }

        let started = Instant::now();
        let outcome = std::panic::AssertUnwindSafe(self.poll_cycle(quick_only))
            .catch_unwind()
            .await;

        let mut state = self.state.write();
        state.polling = false;
        state.poll_duration_ms = started.elapsed().as_millis() as i64;
        drop(state);

        if let Err(panic) = outcome {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            self.log
                .error(format!("[{}] poll panicked: {}", self.key, msg));
        }
    }

    /// One full cycle: quick tier always, big tier when due or reset.
    async fn poll_cycle(&self, quick_only: bool) {
        let budget = PollBudget::new(self.settings.poll_budget_secs);
        self.state.write().reset_this_poll = false;

        let reset = match self.identify(&budget).await {
            Ok(reset) => reset,
            Err(e) => {
                // Cannot even identify the server: the whole cycle is
                // meaningless and the row sorts to the bottom.
                self.record_failure(e, true);
                return;
            }
        };

        if let Err(e) = self.refresh_topology(&budget).await {
            // identity resolved, so the server keeps its place in the
            // display order; the rest of the cycle is abandoned
            self.record_failure(e, false);
            return;
        }

        let big_due = {
            let state = self.state.read();
            match state.last_big_poll {
                None => true,
                Some(last) => (Utc::now() - last).num_seconds() >= self.settings.big_poll_secs,
            }
        };

        if !quick_only && (big_due || reset) {
            match self.big_poll(&budget, reset).await {
                Ok(()) => {
                    self.state.write().last_big_poll = Some(Utc::now());
                    self.record_success();
                    self.write_snapshot_cache().await;
                }
                Err(e) => self.record_failure(e, false),
            }
        } else {
            self.record_success();
        }
    }

    /// Connection reset and identity check. A failure here means the server
    /// is unreachable or unrecognizable. Returns whether the server reset
    /// since the last poll.
    async fn identify(&self, budget: &PollBudget) -> Result<bool> {
        let executor = self.executor.read().clone();

        self.step(executor.reset_connection()).await?;

        budget.check()?;
        let identity = self.step(executor.server_identity()).await?;
        let reset = {
            let mut state = self.state.write();
            let changed = match (&state.server_name, &state.server_start_time) {
                (Some(name), Some(start)) => {
                    *name != identity.server_name || *start != identity.start_time
                }
                _ => false,
            };
            state.server_name = Some(identity.server_name.clone());
            state.server_start_time = Some(identity.start_time);
            state.reset_this_poll = changed;
            changed
        };
        if reset {
            self.log.info(format!(
                "[{}] server identity changed to {}, suppressing deltas for one cycle",
                self.key, identity.server_name
            ));
        }

        Ok(reset)
    }

    /// Properties and availability-group refresh. Runs every cycle after a
    /// successful identity check; a failure here counts as a failed poll but
    /// not a lost server.
    async fn refresh_topology(&self, budget: &PollBudget) -> Result<()> {
        let executor = self.executor.read().clone();

        budget.check()?;
        let properties = self.step(executor.server_properties()).await?;
        self.state.write().properties = Some(properties);

        budget.check()?;
        let groups = self.step(executor.availability_groups()).await?;
        self.state.write().availability_groups = groups;

        Ok(())
    }

    /// Big tier: the full metric/wait/database/backup/disk collection.
    /// Steps run sequentially; a later step observes the side effects of
    /// earlier ones in the same cycle.
    async fn big_poll(&self, budget: &PollBudget, reset: bool) -> Result<()> {
        let executor = self.executor.read().clone();
        let now = Utc::now();

        // Individual metric failures become unpolled samples (chart gaps),
        // never a poll-level error.
        for (metric, kind) in TRACKED_METRICS {
            budget.check()?;
            let value = match self.step(executor.scalar(metric)).await {
                Ok(value) => value,
                Err(e) => {
                    debug!("[{}] metric {} unavailable: {}", self.key, metric, e);
                    None
                }
            };
            self.state
                .write()
                .metrics
                .record(metric, *kind, value, reset, now);
        }

        budget.check()?;
        let raw_waits = self.step(executor.wait_stats()).await?;
        let snapshot = {
            let categories = self.categories.read();
            self.state
                .write()
                .waits
                .record(raw_waits, &categories, reset, now)
        };
        if let Err(e) = self.journal.append(&snapshot).await {
            // Retention on disk is best effort; the in-memory ring is
            // already updated.
            self.log
                .warn(format!("[{}] wait journal append failed: {}", self.key, e));
        }

        budget.check()?;
        let databases = self.step(executor.databases()).await?;
        self.state.write().databases = databases;

        budget.check()?;
        let backups = self.step(executor.backups()).await?;
        self.state.write().backups = backups;

        budget.check()?;
        let disks = self.step(executor.disk_io()).await?;
        self.state.write().disks = disks;

        Ok(())
    }

    /// Bound one executor call with the per-step deadline.
    async fn step<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(StdDuration::from_secs(self.settings.step_timeout_secs), fut)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Sql(format!(
                "query exceeded {}s step timeout",
                self.settings.step_timeout_secs
            ))),
        }
    }

    /// Record a clean cycle; logs a recovery line when the server had been
    /// failing.
    fn record_success(&self) {
        let recovered = {
            let mut state = self.state.write();
            state.last_poll_success = Some(Utc::now());
            state.sort_priority = PRIORITY_OK;
            let recovered = !state.last_poll_error.is_empty();
            state.last_poll_error.clear();
            recovered
        };
        if recovered {
            self.log.info(format!("[{}] polling recovered", self.key));
        }
    }

    /// Record a failed cycle. The error is logged only when its text
    /// changes from the previous cycle, so a persistently-down server does
    /// not spam the log. `structural` failures demote the sort priority.
    fn record_failure(&self, err: MonitorError, structural: bool) {
        let msg = clean_error(&err.to_string());
        let changed = {
            let mut state = self.state.write();
            state.last_poll_fail = Some(Utc::now());
            if structural {
                state.sort_priority = PRIORITY_FAILED;
            }
            let changed = state.last_poll_error != msg;
            state.last_poll_error = msg.clone();
            changed
        };
        if changed {
            self.log.warn(format!("[{}] poll failed: {}", self.key, msg));
        }
    }

    /// Refresh the per-server snapshot cache after a big poll. Best effort:
    /// a failure is logged and the next big poll tries again.
    async fn write_snapshot_cache(&self) {
        let Some(dir) = &self.cache_dir else {
            return;
        };
        let state = self.state.read().clone();
        if let Err(e) = crate::storage::cache::save(&state, dir).await {
            self.log.warn(format!(
                "[{}] snapshot cache write failed: {}",
                self.key, e
            ));
        }
    }
}

/// Startup jitter in whole seconds, derived deterministically from the
/// server key so the fleet spreads over one poll interval.
pub fn jitter_secs(key: &str, poll_interval_secs: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish() % (poll_interval_secs.max(1) + 1)
}

/// Strip driver noise from an error message before it reaches the UI:
/// newlines collapse to spaces and very long messages are truncated.
pub fn clean_error(raw: &str) -> String {
    let cleaned: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() > 300 {
        let mut truncated: String = cleaned.chars().take(300).collect();
        truncated.push('…');
        return truncated;
    }
    cleaned
}
