//! Shared utilities
//!
//! Error types and small helpers used across the monitor.

pub mod error;

pub use error::{MonitorError, Result};
