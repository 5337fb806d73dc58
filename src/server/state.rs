//! Application state shared across HTTP handlers

use std::sync::Arc;

use crate::config::Config;
use crate::core::registry::ServerRegistry;
use crate::core::ring::LogRing;

/// HTTP server state shared across handlers. All fields are Arc'd; handlers
/// read through registry clones and never touch live poll state.
#[derive(Clone)]
pub struct AppState {
    /// Monitor configuration (shared read-only)
    pub config: Arc<Config>,
    /// Registry of monitored servers
    pub registry: Arc<ServerRegistry>,
    /// Operational log ring backing /api/log
    pub log: Arc<LogRing>,
}

impl AppState {
    /// Create a new AppState with shared resources.
    pub fn new(config: Arc<Config>, registry: Arc<ServerRegistry>, log: Arc<LogRing>) -> Self {
        Self {
            config,
            registry,
            log,
        }
    }
}
