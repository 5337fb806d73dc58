//! Per-server poll state
//!
//! The mutable control block for one monitored instance. Owned exclusively
//! by its registry entry behind a single reader/writer lock; HTTP readers
//! only ever receive deep clones, never live references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::metrics::MetricAccumulator;
use crate::core::sql::{
    AgReplicaStatus, BackupInfo, ConnectionDescriptor, DatabaseState, DiskIoSample,
    ServerProperties,
};
use crate::core::waits::WaitAccumulator;

/// Sort priority of a healthy server.
pub const PRIORITY_OK: u8 = 0;

/// Sort priority of a server that failed identity resolution or connection;
/// pushes it to the bottom of the display order.
pub const PRIORITY_FAILED: u8 = 9;

/// Control block plus accumulated entities for one monitored server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerState {
    /// Registry key (unique per listener/alias)
    pub key: String,
    /// Name shown in the UI
    pub display_name: String,
    /// Logical grouping (AD domain or site)
    pub domain: String,
    /// Resolved connection descriptor from the settings layer
    pub connection: ConnectionDescriptor,

    /// Name the server reports about itself, once identified
    pub server_name: Option<String>,
    /// Remote process start time, once identified
    pub server_start_time: Option<DateTime<Utc>>,
    /// Static instance properties from the last quick poll
    pub properties: Option<ServerProperties>,
    /// Availability-group membership from the last quick poll
    pub availability_groups: Vec<AgReplicaStatus>,
    /// Database list from the last big poll
    pub databases: Vec<DatabaseState>,
    /// Most recent backups from the last big poll
    pub backups: Vec<BackupInfo>,
    /// Cumulative disk I/O counters from the last big poll
    pub disks: Vec<DiskIoSample>,

    /// True while a poll is in flight; ticks arriving meanwhile are skipped
    pub polling: bool,
    /// Start of the in-flight (or last) poll
    pub poll_start: Option<DateTime<Utc>>,
    /// Duration of the last completed poll
    pub poll_duration_ms: i64,
    /// Last tick that completed without error
    pub last_poll_success: Option<DateTime<Utc>>,
    /// Last tick that recorded an error
    pub last_poll_fail: Option<DateTime<Utc>>,
    /// Cleaned message of the most recent error, empty when healthy
    pub last_poll_error: String,
    /// Identity or start time changed since the previous poll; all delta
    /// computation is suppressed for exactly this cycle
    pub reset_this_poll: bool,
    /// Display ordering tier; failures demote to the bottom
    pub sort_priority: u8,
    /// When the last full metric collection ran
    pub last_big_poll: Option<DateTime<Utc>>,

    /// Scheduler ticks observed (including skipped ones)
    pub ticks: u64,
    /// Polls actually executed
    pub polls: u64,
    /// Ticks skipped because a poll was still in flight
    pub skipped_ticks: u64,

    /// Per-metric sample rings
    pub metrics: MetricAccumulator,
    /// Wait-stat history
    pub waits: WaitAccumulator,
}

impl ServerState {
    /// Fresh state for a newly registered server. Accumulator rings fill
    /// lazily on first poll.
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        domain: impl Into<String>,
        connection: ConnectionDescriptor,
    ) -> Self {
        let key = key.into();
        Self {
            display_name: display_name.into(),
            domain: domain.into(),
            connection,
            server_name: None,
            server_start_time: None,
            properties: None,
            availability_groups: Vec::new(),
            databases: Vec::new(),
            backups: Vec::new(),
            disks: Vec::new(),
            polling: false,
            poll_start: None,
            poll_duration_ms: 0,
            last_poll_success: None,
            last_poll_fail: None,
            last_poll_error: String::new(),
            reset_this_poll: false,
            sort_priority: PRIORITY_OK,
            last_big_poll: None,
            ticks: 0,
            polls: 0,
            skipped_ticks: 0,
            waits: WaitAccumulator::new(key.clone()),
            metrics: MetricAccumulator::new(),
            key,
        }
    }

    /// Stable display-order key: zero-padded priority, then the
    /// case-insensitive display name.
    pub fn sort_key(&self) -> String {
        format!("{:03}-{}", self.sort_priority, self.display_name.to_lowercase())
    }

    /// Identity used by `clone_unique` to de-duplicate servers reachable
    /// through multiple registry keys.
    pub fn unique_key(&self) -> (String, String) {
        let resolved = self
            .server_name
            .clone()
            .unwrap_or_else(|| self.display_name.clone());
        (self.domain.to_lowercase(), resolved.to_lowercase())
    }
}
