//! Monitor wiring and run loop
//!
//! Builds the shared components (log ring, category table, registry),
//! registers the configured servers, spawns the background maintenance
//! tasks, and serves the HTTP API.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::registry::ServerRegistry;
use crate::core::ring::LogRing;
use crate::core::sql::SimulatedFactory;
use crate::core::waits::{journal, CategoryMap};
use crate::server::server::HttpServer;
use crate::server::state::AppState;
use crate::utils::error::Result;

/// Load configuration, start polling every configured server, and serve the
/// API until shutdown.
pub async fn run_server(config_path: &Path) -> Result<()> {
    info!("Starting sqlfleet monitor");

    let config = match Config::from_file(config_path).await {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "Configuration file {:?} not usable ({}), starting with defaults",
                config_path, e
            );
            Config::default()
        }
    };
    let config = Arc::new(config);

    let log = Arc::new(LogRing::default());
    let categories = Arc::new(RwLock::new(
        CategoryMap::load(config.monitor.wait_category_overrides.as_deref()).await?,
    ));

    let registry = Arc::new(ServerRegistry::new(
        Arc::new(SimulatedFactory),
        categories,
        log.clone(),
        config.poll_settings(),
        config.monitor.retention.journal_dir.clone(),
        config.monitor.retention.cache_dir.clone(),
        config.monitor.retention.cache_max_age_minutes,
    ));

    for entry in &config.monitor.servers {
        if let Err(e) = registry
            .add(
                &entry.key,
                entry.display_name(),
                &entry.domain,
                entry.connection.clone(),
            )
            .await
        {
            warn!("Could not register server {}: {}", entry.key, e);
        }
    }
    info!("Monitoring {} servers", registry.len());

    spawn_journal_purge(config.clone());

    let state = AppState::new(config.clone(), registry, log);
    HttpServer::new(config.monitor.listen.clone(), state)
        .start()
        .await
}

/// Background task deleting expired wait-journal files every ten minutes.
fn spawn_journal_purge(config: Arc<Config>) {
    tokio::spawn(async move {
        let dir = config.monitor.retention.journal_dir.clone();
        let retention = config.monitor.retention.journal_retention_minutes;
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let removed = journal::purge_old_files(&dir, retention).await;
            if removed > 0 {
                info!("Purged {} expired wait-journal files", removed);
            }
        }
    });
}
