//! Persistence integration tests
//!
//! Restart behavior: the snapshot cache restores rings before the first
//! poll, and the wait journal fills in when no usable cache exists.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::RwLock;
    use tempfile::TempDir;

    use sqlfleet::core::poller::PollSettings;
    use sqlfleet::core::ring::LogRing;
    use sqlfleet::core::sql::{ConnectionDescriptor, SimulatedFactory};
    use sqlfleet::core::waits::CategoryMap;
    use sqlfleet::ServerRegistry;

    const KEY: &str = "sql01:1433";

    fn registry(journal_dir: &TempDir, cache_dir: Option<&TempDir>) -> ServerRegistry {
        let settings = PollSettings {
            poll_interval_secs: 1,
            ..PollSettings::default()
        };
        ServerRegistry::new(
            Arc::new(SimulatedFactory),
            Arc::new(RwLock::new(CategoryMap::base())),
            Arc::new(LogRing::new(1000)),
            settings,
            journal_dir.path(),
            cache_dir.map(|d| d.path().to_path_buf()),
            60,
        )
    }

    /// Runs one registry long enough for a few big polls, then shuts it
    /// down, leaving cache and journal files behind.
    async fn run_first_generation(journal_dir: &TempDir, cache_dir: &TempDir) {
        let registry = registry(journal_dir, Some(cache_dir));
        registry
            .add(KEY, "SQL01", "corp", ConnectionDescriptor::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(registry.clone_one(KEY).unwrap().waits.newest().is_some());
        registry.shutdown().await;
    }

    /// A restarted registry restores rings from the snapshot cache before
    /// its first poll runs.
    #[tokio::test]
    async fn test_cache_restores_state_across_restart() {
        let journal_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        run_first_generation(&journal_dir, &cache_dir).await;

        let registry = registry(&journal_dir, Some(&cache_dir));
        registry
            .add(KEY, "SQL01", "corp", ConnectionDescriptor::default())
            .await
            .unwrap();

        // inspected immediately: nothing here came from a poll
        let state = registry.clone_one(KEY).unwrap();
        assert!(state.waits.newest().is_some());
        assert!(!state.metrics.values("batch_requests").is_empty());
        assert_eq!(state.server_name.as_deref(), Some("SQL01:1433"));
        assert!(!state.polling);

        registry.shutdown().await;
    }

    /// Without a cache the journal replay still pre-populates the wait
    /// ring, so charts keep their history across a restart.
    #[tokio::test]
    async fn test_journal_replay_preloads_wait_history() {
        let journal_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        run_first_generation(&journal_dir, &cache_dir).await;

        let registry = registry(&journal_dir, None);
        registry
            .add(KEY, "SQL01", "corp", ConnectionDescriptor::default())
            .await
            .unwrap();

        let state = registry.clone_one(KEY).unwrap();
        assert!(state.waits.newest().is_some());
        // metrics are not journaled, only waits survive this path
        assert!(state.metrics.values("batch_requests").is_empty());

        registry.shutdown().await;
    }
}
