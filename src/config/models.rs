//! Configuration models
//!
//! Serde-backed configuration structs with defaults matching the production
//! cadence: 10-second ticks, big polls at most every 51 seconds, a
//! 120-second whole-poll budget.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::sql::ConnectionDescriptor;

/// Seconds between scheduler ticks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Minimum seconds between big polls.
pub const DEFAULT_BIG_POLL_SECS: i64 = 51;

/// Whole-poll wall-clock budget in seconds.
pub const DEFAULT_POLL_BUDGET_SECS: u64 = 120;

/// Per-query deadline in seconds.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 60;

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8675
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Poll cadence and budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between ticks
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Minimum seconds between big polls
    #[serde(default = "default_big_poll")]
    pub big_poll_secs: i64,
    /// Whole-poll budget in seconds
    #[serde(default = "default_budget")]
    pub budget_secs: u64,
    /// Per-query deadline in seconds
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_big_poll() -> i64 {
    DEFAULT_BIG_POLL_SECS
}

fn default_budget() -> u64 {
    DEFAULT_POLL_BUDGET_SECS
}

fn default_step_timeout() -> u64 {
    DEFAULT_STEP_TIMEOUT_SECS
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            big_poll_secs: default_big_poll(),
            budget_secs: default_budget(),
            step_timeout_secs: default_step_timeout(),
        }
    }
}

/// On-disk retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Directory for the append-only wait journals
    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,
    /// Journal files older than this are purged
    #[serde(default = "default_journal_retention")]
    pub journal_retention_minutes: u64,
    /// Directory for per-server snapshot caches; omit to disable caching
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Cached snapshots older than this are ignored at startup
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_minutes: i64,
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from("data/waits")
}

fn default_journal_retention() -> u64 {
    crate::core::waits::journal::RETENTION_MINUTES
}

fn default_cache_max_age() -> i64 {
    60
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            journal_dir: default_journal_dir(),
            journal_retention_minutes: default_journal_retention(),
            cache_dir: None,
            cache_max_age_minutes: default_cache_max_age(),
        }
    }
}

/// One monitored server as declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Registry key, unique per listener/alias
    pub key: String,
    /// Name shown in the UI; defaults to the key
    #[serde(default)]
    pub display_name: Option<String>,
    /// Logical grouping (AD domain or site)
    #[serde(default)]
    pub domain: String,
    /// Resolved connection descriptor
    #[serde(default)]
    pub connection: ConnectionDescriptor,
}

impl ServerEntry {
    /// Display name falling back to the key.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.key)
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// HTTP listener
    #[serde(default)]
    pub listen: ListenConfig,
    /// Poll cadence and budgets
    #[serde(default)]
    pub polling: PollingConfig,
    /// On-disk retention
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Optional wait-category override file
    #[serde(default)]
    pub wait_category_overrides: Option<PathBuf>,
    /// Monitored servers
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    /// Free-form labels attached to /status output
    #[serde(default)]
    pub labels: HashMap<String, String>,
}
