//! Seam to the SQL execution layer
//!
//! The monitor core is agnostic to how queries are issued: it consumes
//! already-executed scalar and row results through the `SqlExecutor` trait.
//! Real drivers live outside this crate; a deterministic simulated executor
//! is included for local runs and tests.

pub mod simulated;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// Resolved connection descriptor handed over by the settings layer.
/// The core never parses or stores credentials itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Driver kind, e.g. "mssql" or "simulated"
    pub kind: String,
    /// Opaque connection string, passed through to the driver
    #[serde(default)]
    pub connection_string: String,
}

/// Identity a server reports about itself. A change in either field between
/// polls signals a reset: delta computations are suppressed for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerIdentity {
    /// Reported server name
    pub server_name: String,
    /// Process start time of the remote instance
    pub start_time: DateTime<Utc>,
}

/// Static properties collected on every quick poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerProperties {
    /// Product version string
    pub version: String,
    /// Edition string
    pub edition: String,
    /// Core count visible to the instance
    pub cpu_count: u32,
    /// Physical memory visible to the instance, in MB
    pub memory_mb: u64,
}

/// Availability-group replica membership and replication lag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgReplicaStatus {
    /// Availability group name
    pub group_name: String,
    /// Replica server name
    pub replica_name: String,
    /// Primary or secondary
    pub is_primary: bool,
    /// Synchronization state string as reported
    pub sync_state: String,
    /// Estimated replication lag in seconds, when derivable
    pub lag_secs: Option<i64>,
}

/// Per-database state row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseState {
    /// Database name
    pub name: String,
    /// ONLINE, RESTORING, SUSPECT, ...
    pub state: String,
    /// Recovery model string
    pub recovery_model: String,
    /// Data + log size in MB
    pub size_mb: f64,
}

/// Most recent backup of one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Database name
    pub database: String,
    /// Full, differential, or log
    pub backup_type: String,
    /// When the backup finished
    pub finished_at: DateTime<Utc>,
}

/// One disk/file I/O counter row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskIoSample {
    /// Drive or mount point
    pub drive: String,
    /// Cumulative bytes read
    pub bytes_read: i64,
    /// Cumulative bytes written
    pub bytes_written: i64,
    /// Cumulative I/O stall milliseconds
    pub stall_ms: i64,
}

/// Executes queries against one monitored server. Implementations are the
/// out-of-scope collaborators (real drivers); the core only consumes their
/// typed results.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Drop and re-open the underlying connection.
    async fn reset_connection(&self) -> Result<()>;

    /// Reported name and process start time.
    async fn server_identity(&self) -> Result<ServerIdentity>;

    /// Static instance properties.
    async fn server_properties(&self) -> Result<ServerProperties>;

    /// Availability-group membership, empty when not configured.
    async fn availability_groups(&self) -> Result<Vec<AgReplicaStatus>>;

    /// One named counter. `Ok(None)` means the query returned no rows:
    /// value unavailable this cycle, not an error.
    async fn scalar(&self, metric: &str) -> Result<Option<i64>>;

    /// Cumulative wait time per wait type, in milliseconds.
    async fn wait_stats(&self) -> Result<HashMap<String, i64>>;

    /// Database list with state.
    async fn databases(&self) -> Result<Vec<DatabaseState>>;

    /// Most recent backups per database.
    async fn backups(&self) -> Result<Vec<BackupInfo>>;

    /// Cumulative per-drive I/O counters.
    async fn disk_io(&self) -> Result<Vec<DiskIoSample>>;
}

/// Builds executors from connection descriptors. The registry owns one
/// factory and calls it whenever a server is added or its connection is
/// updated.
pub trait ExecutorFactory: Send + Sync {
    /// Create an executor for one server.
    fn create(&self, key: &str, descriptor: &ConnectionDescriptor) -> Arc<dyn SqlExecutor>;
}

/// Factory producing simulated executors for every descriptor. Default for
/// local runs; deployments plug in a driver-backed factory.
#[derive(Debug, Default)]
pub struct SimulatedFactory;

impl ExecutorFactory for SimulatedFactory {
    fn create(&self, key: &str, _descriptor: &ConnectionDescriptor) -> Arc<dyn SqlExecutor> {
        Arc::new(simulated::SimulatedExecutor::new(key))
    }
}
