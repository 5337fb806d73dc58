//! Deterministic simulated executor
//!
//! Produces plausible, steadily accumulating counters keyed off the server
//! name so local runs and tests exercise the full poll pipeline without a
//! real SQL Server.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::{
    AgReplicaStatus, BackupInfo, DatabaseState, DiskIoSample, ServerIdentity, ServerProperties,
    SqlExecutor,
};
use crate::utils::error::Result;

/// Simulated server with monotonically advancing counters.
#[derive(Debug)]
pub struct SimulatedExecutor {
    server_name: String,
    seed: i64,
    ticks: AtomicI64,
}

impl SimulatedExecutor {
    /// Create a simulator for one server key.
    pub fn new(key: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Self {
            server_name: key.to_uppercase(),
            seed: (hasher.finish() % 1000) as i64 + 1,
            ticks: AtomicI64::new(0),
        }
    }

    fn tick(&self) -> i64 {
        self.ticks.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl SqlExecutor for SimulatedExecutor {
    async fn reset_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn server_identity(&self) -> Result<ServerIdentity> {
        Ok(ServerIdentity {
            server_name: self.server_name.clone(),
            start_time: Utc::now() - Duration::days(self.seed % 30 + 1),
        })
    }

    async fn server_properties(&self) -> Result<ServerProperties> {
        Ok(ServerProperties {
            version: "16.0.4105.2".to_string(),
            edition: "Developer Edition (64-bit)".to_string(),
            cpu_count: 8,
            memory_mb: 32_768,
        })
    }

    async fn availability_groups(&self) -> Result<Vec<AgReplicaStatus>> {
        Ok(Vec::new())
    }

    async fn scalar(&self, metric: &str) -> Result<Option<i64>> {
        if metric == "cpu_percent" {
            // wanders through 0..100 instead of accumulating
            return Ok(Some((self.tick() * 7 + self.seed) % 100));
        }
        let mut hasher = DefaultHasher::new();
        metric.hash(&mut hasher);
        let per_tick = (hasher.finish() % 500) as i64 + self.seed;
        Ok(Some(self.tick() * per_tick + per_tick))
    }

    async fn wait_stats(&self) -> Result<HashMap<String, i64>> {
        let tick = self.tick();
        let mut stats = HashMap::new();
        stats.insert("WRITELOG".to_string(), tick * 120 + self.seed);
        stats.insert("LCK_M_S".to_string(), tick * 40 + self.seed);
        stats.insert("CXPACKET".to_string(), tick * 250 + self.seed);
        stats.insert("LAZYWRITER_SLEEP".to_string(), tick * 10_000 + self.seed);
        Ok(stats)
    }

    async fn databases(&self) -> Result<Vec<DatabaseState>> {
        Ok(vec![
            DatabaseState {
                name: "master".to_string(),
                state: "ONLINE".to_string(),
                recovery_model: "SIMPLE".to_string(),
                size_mb: 64.0,
            },
            DatabaseState {
                name: "AppDb".to_string(),
                state: "ONLINE".to_string(),
                recovery_model: "FULL".to_string(),
                size_mb: 4096.0 + self.seed as f64,
            },
        ])
    }

    async fn backups(&self) -> Result<Vec<BackupInfo>> {
        Ok(vec![BackupInfo {
            database: "AppDb".to_string(),
            backup_type: "FULL".to_string(),
            finished_at: Utc::now() - Duration::hours(self.seed % 24),
        }])
    }

    async fn disk_io(&self) -> Result<Vec<DiskIoSample>> {
        let tick = self.tick();
        Ok(vec![DiskIoSample {
            drive: "C:".to_string(),
            bytes_read: tick * 1_048_576,
            bytes_written: tick * 524_288,
            stall_ms: tick * 7,
        }])
    }
}
