//! Append-only wait-snapshot journal
//!
//! Each poll interval appends the full wait snapshot as one JSON line to a
//! per-server file named by a 10-minute time bucket, giving the wait history
//! a longer lookback than the in-memory ring. Old files are purged by
//! modification time; replay at startup globs the files back and skips
//! anything malformed.

use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, SystemTime};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::WaitSnapshot;
use crate::utils::error::Result;

/// Width of one journal file's time bucket.
const BUCKET_SECS: i64 = 600;

/// Journal files older than this are purged.
pub const RETENTION_MINUTES: u64 = 85;

/// Handle to one server's journal directory.
#[derive(Debug, Clone)]
pub struct WaitJournal {
    dir: PathBuf,
    server_key: String,
}

impl WaitJournal {
    /// Create a journal rooted at `dir` for one server key.
    pub fn new(dir: impl Into<PathBuf>, server_key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            server_key: server_key.into(),
        }
    }

    /// File a snapshot at `epoch_secs` lands in.
    fn bucket_path(&self, epoch_secs: i64) -> PathBuf {
        let bucket = epoch_secs.div_euclid(BUCKET_SECS);
        self.dir
            .join(format!("{}_{}.ndjson", sanitize_key(&self.server_key), bucket))
    }

    /// Append one snapshot as a JSON line, creating the directory and file
    /// as needed.
    pub async fn append(&self, snapshot: &WaitSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.bucket_path(snapshot.captured_at.timestamp());
        let mut line = serde_json::to_string(snapshot)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Read back all retained snapshots for this server, oldest file first.
    /// Lines that fail to parse or belong to a different key are skipped
    /// with a warning; a missing directory yields an empty history.
    pub async fn replay(&self) -> Vec<WaitSnapshot> {
        let pattern = self
            .dir
            .join(format!("{}_*.ndjson", sanitize_key(&self.server_key)));
        let Some(pattern) = pattern.to_str().map(String::from) else {
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = match glob::glob(&pattern) {
            Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
            Err(e) => {
                warn!("Invalid wait-journal glob {}: {}", pattern, e);
                return Vec::new();
            }
        };
        paths.sort();

        let mut snapshots = Vec::new();
        for path in paths {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable wait journal {:?}: {}", path, e);
                    continue;
                }
            };
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<WaitSnapshot>(line) {
                    Ok(snapshot) if snapshot.server_key == self.server_key => {
                        snapshots.push(snapshot)
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Skipping malformed wait-journal line in {:?}: {}", path, e);
                    }
                }
            }
        }
        debug!(
            "Replayed {} wait snapshots for {}",
            snapshots.len(),
            self.server_key
        );
        snapshots
    }
}

/// Delete journal files under `dir` whose modification time is older than
/// `retention_minutes`. Returns the number of files removed; individual
/// failures are logged and skipped.
pub async fn purge_old_files(dir: &Path, retention_minutes: u64) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };
    let cutoff = SystemTime::now() - StdDuration::from_secs(retention_minutes * 60);

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("ndjson") {
            continue;
        }
        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Cannot stat wait journal {:?}: {}", path, e);
                continue;
            }
        };
        if modified < cutoff {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Cannot purge wait journal {:?}: {}", path, e),
            }
        }
    }
    if removed > 0 {
        debug!("Purged {} expired wait-journal files", removed);
    }
    removed
}

/// Server keys may contain characters unfit for filenames.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
