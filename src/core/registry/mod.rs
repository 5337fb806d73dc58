//! Server registry
//!
//! Concurrent map of server key to poll state plus accumulated entities.
//! Adding a server spawns its polling loop; removal signals the loop to
//! stop. Readers never touch live state: every accessor returns a deep
//! clone taken under a momentary lock.

pub mod state;


pub use state::ServerState;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{watch, Notify};
use tracing::debug;

use crate::core::poller::{PollScheduler, PollSettings};
use crate::core::ring::LogRing;
use crate::core::sql::{ConnectionDescriptor, ExecutorFactory, SqlExecutor};
use crate::core::waits::{CategoryMap, WaitJournal};
use crate::storage::cache;
use crate::utils::error::{MonitorError, Result};

/// One registered server: shared state, swappable executor, and the
/// scheduler task's control signals.
struct ServerHandle {
    state: Arc<RwLock<ServerState>>,
    executor: Arc<RwLock<Arc<dyn SqlExecutor>>>,
    stop: watch::Sender<bool>,
    repoll: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

/// Registry of all monitored servers. One scheduler task per entry.
pub struct ServerRegistry {
    servers: DashMap<String, ServerHandle>,
    factory: Arc<dyn ExecutorFactory>,
    categories: Arc<RwLock<CategoryMap>>,
    log: Arc<LogRing>,
    settings: PollSettings,
    journal_dir: PathBuf,
    cache_dir: Option<PathBuf>,
    cache_max_age_minutes: i64,
}

impl ServerRegistry {
    /// Create an empty registry.
    pub fn new(
        factory: Arc<dyn ExecutorFactory>,
        categories: Arc<RwLock<CategoryMap>>,
        log: Arc<LogRing>,
        settings: PollSettings,
        journal_dir: impl Into<PathBuf>,
        cache_dir: Option<PathBuf>,
        cache_max_age_minutes: i64,
    ) -> Self {
        Self {
            servers: DashMap::new(),
            factory,
            categories,
            log,
            settings,
            journal_dir: journal_dir.into(),
            cache_dir,
            cache_max_age_minutes,
        }
    }

    /// Handle to the shared wait-category table.
    pub fn categories(&self) -> Arc<RwLock<CategoryMap>> {
        self.categories.clone()
    }

    /// Number of registered servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Register a server and start its polling loop. Rings are
    /// pre-populated from the snapshot cache (or, failing that, the wait
    /// journal) before the first poll runs.
    pub async fn add(
        &self,
        key: &str,
        display_name: &str,
        domain: &str,
        connection: ConnectionDescriptor,
    ) -> Result<()> {
        if self.servers.contains_key(key) {
            return Err(MonitorError::Internal(format!(
                "server {} is already registered",
                key
            )));
        }

        let mut state = ServerState::new(key, display_name, domain, connection.clone());
        let journal = WaitJournal::new(&self.journal_dir, key);

        let mut restored_from_cache = false;
        if let Some(dir) = &self.cache_dir {
            if let Some(cached) = cache::load(key, dir, self.cache_max_age_minutes).await {
                state.metrics = cached.metrics;
                state.waits = cached.waits;
                state.server_name = cached.server_name;
                state.server_start_time = cached.server_start_time;
                state.properties = cached.properties;
                state.availability_groups = cached.availability_groups;
                state.databases = cached.databases;
                state.backups = cached.backups;
                state.disks = cached.disks;
                restored_from_cache = true;
                self.log
                    .info(format!("[{}] restored state from snapshot cache", key));
            }
        }
        if !restored_from_cache {
            let replayed = journal.replay().await;
            if !replayed.is_empty() {
                self.log.info(format!(
                    "[{}] replayed {} wait snapshots from journal",
                    key,
                    replayed.len()
                ));
                state.waits.preload(replayed);
            }
        }

        let state = Arc::new(RwLock::new(state));
        let executor = Arc::new(RwLock::new(self.factory.create(key, &connection)));
        let (stop_tx, stop_rx) = watch::channel(false);
        let repoll = Arc::new(Notify::new());

        let scheduler = Arc::new(PollScheduler::new(
            key,
            state.clone(),
            executor.clone(),
            self.categories.clone(),
            journal,
            self.settings.clone(),
            self.log.clone(),
            self.cache_dir.clone(),
        ));
        let task = tokio::spawn(scheduler.run(stop_rx, repoll.clone()));

        self.servers.insert(
            key.to_string(),
            ServerHandle {
                state,
                executor,
                stop: stop_tx,
                repoll,
                task,
            },
        );
        self.log.info(format!("Monitoring server {}", key));
        Ok(())
    }

    /// Signal a server's loop to stop and drop its entry. The in-flight
    /// poll, if any, finishes before the task exits.
    pub fn remove(&self, key: &str) -> bool {
        match self.servers.remove(key) {
            Some((_, handle)) => {
                let _ = handle.stop.send(true);
                self.log.info(format!("Stopped monitoring server {}", key));
                true
            }
            None => false,
        }
    }

    /// Swap a server's connection descriptor and trigger an out-of-band
    /// re-poll through the new connection.
    pub fn update_connection(&self, key: &str, connection: ConnectionDescriptor) -> Result<()> {
        let handle = self
            .servers
            .get(key)
            .ok_or_else(|| MonitorError::NotFound(format!("server {}", key)))?;
        *handle.executor.write() = self.factory.create(key, &connection);
        handle.state.write().connection = connection;
        handle.repoll.notify_one();
        debug!("[{}] connection updated, re-poll requested", key);
        Ok(())
    }

    /// Deep copy of one server's state.
    pub fn clone_one(&self, key: &str) -> Option<ServerState> {
        self.servers.get(key).map(|h| h.state.read().clone())
    }

    /// Deep copies of every server's state, in registry order.
    pub fn clone_all(&self) -> Vec<ServerState> {
        self.servers
            .iter()
            .map(|entry| entry.value().state.read().clone())
            .collect()
    }

    /// Deep copies de-duplicated by (domain, resolved server name), so a
    /// server reachable through several keys or listeners reports once.
    /// Display order.
    pub fn clone_unique(&self) -> Vec<ServerState> {
        let mut all = self.clone_all();
        all.sort_by_key(|s| s.sort_key());
        let mut seen = HashSet::new();
        all.retain(|s| seen.insert(s.unique_key()));
        all
    }

    /// Registry keys in display order: zero-padded sort priority first
    /// (failed servers sink to the bottom), then case-insensitive display
    /// name.
    pub fn sort_keys(&self) -> Vec<String> {
        let mut keyed: Vec<(String, String)> = self
            .servers
            .iter()
            .map(|entry| (entry.value().state.read().sort_key(), entry.key().clone()))
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, key)| key).collect()
    }

    /// Signal every polling loop to stop and wait for the tasks to finish.
    pub async fn shutdown(&self) {
        let keys: Vec<String> = self.servers.iter().map(|e| e.key().clone()).collect();
        let mut tasks = Vec::new();
        for key in keys {
            if let Some((_, handle)) = self.servers.remove(&key) {
                let _ = handle.stop.send(true);
                tasks.push(handle.task);
            }
        }
        for task in tasks {
            let _ = task.await;
        }
        self.log.info("All polling loops stopped");
    }
}
