//! Poll pipeline integration tests
//!
//! Drives the registry end to end through the simulated executor: polling
//! loops start, accumulate metrics and wait deltas, and shut down cleanly.

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

    fn registry(journal_dir: &TempDir, cache_dir: &TempDir) -> ServerRegistry {
        // 1s interval keeps startup jitter and the first full collection
        // inside the test's wait
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
            Some(cache_dir.path().to_path_buf()),
            60,
        )
    }

    /// Two servers accumulate independent state through their own loops.
    #[tokio::test]
    async fn test_fleet_accumulates_metrics_and_waits() {
        let journal_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let registry = registry(&journal_dir, &cache_dir);

        for key in ["sql01:1433", "sql02:1433"] {
            registry
                .add(key, key, "corp", ConnectionDescriptor::default())
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        for key in ["sql01:1433", "sql02:1433"] {
            let state = registry.clone_one(key).unwrap();
            assert_eq!(state.server_name.as_deref(), Some(&key.to_uppercase()[..]));
            assert!(state.properties.is_some());
            assert!(state.last_big_poll.is_some());
            assert!(!state.databases.is_empty());
            assert!(!state.metrics.values("batch_requests").is_empty());
            let cpu = state
                .metrics
                .values("cpu_percent")
                .into_iter()
                .rfind(|s| s.polled)
                .unwrap();
            assert!((0..100).contains(&cpu.value));
            assert!(state.waits.newest().is_some());
        }

        registry.shutdown().await;
    }

    /// Consecutive polls turn the simulator's monotonic counters into
    /// positive rates and per-minute wait deltas.
    #[tokio::test]
    async fn test_rates_and_deltas_become_positive() {
        let journal_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let registry = registry(&journal_dir, &cache_dir);

        registry
            .add("sql01:1433", "SQL01", "corp", ConnectionDescriptor::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        let state = registry.clone_one("sql01:1433").unwrap();
        let samples = state.metrics.values("batch_requests");
        assert!(
            samples.iter().any(|s| s.polled && s.rate_per_sec > 0.0),
            "expected at least one polled sample with a positive rate"
        );
        let snapshots = state.waits.values();
        assert!(snapshots
            .iter()
            .any(|s| s.summary.values().any(|&delta| delta > 0.0)));
        // the idle category never reaches summaries
        assert!(snapshots.iter().all(|s| !s.summary.contains_key("Idle")));

        registry.shutdown().await;
    }

    /// Every big poll appends to the on-disk wait journal.
    #[tokio::test]
    async fn test_journal_files_are_written() {
        let journal_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let registry = registry(&journal_dir, &cache_dir);

        registry
            .add("sql01:1433", "SQL01", "corp", ConnectionDescriptor::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        registry.shutdown().await;

        let journal_files: Vec<_> = std::fs::read_dir(journal_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext == "ndjson")
                    .unwrap_or(false)
            })
            .collect();
        assert!(!journal_files.is_empty());
    }
}
