//! Per-server snapshot cache
//!
//! One JSON file per server key, rewritten after every big poll and read
//! back once at startup. Stale or malformed files are skipped with a log
//! line; this path is never fatal.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::core::registry::ServerState;
use crate::utils::error::Result;

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    let safe: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{}.json", safe))
}

/// Write one server's full state. The file is written to a temp path and
/// renamed so readers never observe a partial snapshot.
pub async fn save(state: &ServerState, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = cache_path(dir, &state.key);
    let tmp = path.with_extension("json.tmp");

    let encoded = serde_json::to_vec(state)?;
    tokio::fs::write(&tmp, &encoded).await?;
    tokio::fs::rename(&tmp, &path).await?;
    debug!("[{}] snapshot cache refreshed", state.key);
    Ok(())
}

/// Read one server's cached state back. Returns `None` when the file is
/// missing, older than `max_age_minutes`, or fails to parse; in-flight
/// poll flags are cleared on the way out.
pub async fn load(key: &str, dir: &Path, max_age_minutes: i64) -> Option<ServerState> {
    let path = cache_path(dir, key);
    let metadata = tokio::fs::metadata(&path).await.ok()?;
    let modified = metadata.modified().ok()?;

    let max_age = Duration::from_secs(max_age_minutes.max(0) as u64 * 60);
    if SystemTime::now()
        .duration_since(modified)
        .map(|age| age > max_age)
        .unwrap_or(true)
    {
        debug!("[{}] snapshot cache is stale, ignoring", key);
        return None;
    }

    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("[{}] snapshot cache unreadable: {}", key, e);
            return None;
        }
    };
    let mut state: ServerState = match serde_json::from_slice(&content) {
        Ok(state) => state,
        Err(e) => {
            warn!("[{}] snapshot cache malformed, ignoring: {}", key, e);
            return None;
        }
    };

    // the cached copy may have been written mid-poll
    state.polling = false;
    state.reset_this_poll = false;
    state.poll_start = None;
    Some(state)
}
