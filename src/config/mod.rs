//! Configuration management
//!
//! Loads and validates the monitor's YAML configuration.

pub mod models;

pub use models::{
    ListenConfig, MonitorConfig, PollingConfig, RetentionConfig, ServerEntry,
    DEFAULT_BIG_POLL_SECS, DEFAULT_POLL_BUDGET_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_STEP_TIMEOUT_SECS,
};

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::core::poller::PollSettings;
use crate::utils::error::{MonitorError, Result};

/// Main configuration struct for the monitor
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Monitor configuration
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MonitorError::Config(format!("Failed to read config file: {}", e)))?;

        let monitor: MonitorConfig = serde_yaml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self { monitor };
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Reject configurations the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.polling.interval_secs == 0 {
            return Err(MonitorError::Config(
                "polling.interval_secs must be positive".to_string(),
            ));
        }
        if self.monitor.polling.budget_secs == 0 {
            return Err(MonitorError::Config(
                "polling.budget_secs must be positive".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        for server in &self.monitor.servers {
            if server.key.trim().is_empty() {
                return Err(MonitorError::Config(
                    "server entries require a non-empty key".to_string(),
                ));
            }
            if !keys.insert(server.key.as_str()) {
                return Err(MonitorError::Config(format!(
                    "duplicate server key: {}",
                    server.key
                )));
            }
        }
        Ok(())
    }

    /// Poll cadence knobs in the shape the scheduler consumes.
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            poll_interval_secs: self.monitor.polling.interval_secs,
            big_poll_secs: self.monitor.polling.big_poll_secs,
            poll_budget_secs: self.monitor.polling.budget_secs,
            step_timeout_secs: self.monitor.polling.step_timeout_secs,
        }
    }
}
