//! Error types for the monitor

use thiserror::Error;

/// Result type alias for the monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for the monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors reported by the SQL execution layer
    #[error("SQL error: {0}")]
    Sql(String),

    /// A poll cycle exceeded its wall-clock budget
    #[error("poll timeout after {elapsed_secs}s (budget {budget_secs}s)")]
    PollTimeout {
        /// Seconds elapsed when the budget check fired
        elapsed_secs: u64,
        /// Configured whole-poll budget in seconds
        budget_secs: u64,
    },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_display() {
        let err = MonitorError::PollTimeout {
            elapsed_secs: 131,
            budget_secs: 120,
        };
        assert_eq!(err.to_string(), "poll timeout after 131s (budget 120s)");
    }
}
