//! Wait-type to category mapping
//!
//! SQL Server reports hundreds of granular wait types; the dashboard charts
//! a coarser set of display categories. The mapping starts from a built-in
//! base table and can be adjusted by a user override file. Some categories
//! (idle/background waits) are excluded from the category summary entirely,
//! though their raw per-type deltas remain queryable.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::info;

use crate::utils::error::Result;

/// Category that the base table excludes from summaries.
pub const IDLE_CATEGORY: &str = "Idle";

/// Built-in wait-type → category base table. Deliberately partial: an
/// unmapped wait type becomes its own category.
static BASE_TABLE: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("ASYNC_NETWORK_IO", "Network"),
        ("NETWORK_IO", "Network"),
        ("PAGEIOLATCH_SH", "Disk"),
        ("PAGEIOLATCH_EX", "Disk"),
        ("PAGEIOLATCH_UP", "Disk"),
        ("WRITELOG", "Log"),
        ("LOGBUFFER", "Log"),
        ("LCK_M_S", "Lock"),
        ("LCK_M_X", "Lock"),
        ("LCK_M_U", "Lock"),
        ("LCK_M_IX", "Lock"),
        ("CXPACKET", "Parallelism"),
        ("CXCONSUMER", "Parallelism"),
        ("SOS_SCHEDULER_YIELD", "CPU"),
        ("THREADPOOL", "CPU"),
        ("RESOURCE_SEMAPHORE", "Memory"),
        ("RESOURCE_SEMAPHORE_QUERY_COMPILE", "Memory"),
        ("HADR_SYNC_COMMIT", "AlwaysOn"),
        ("HADR_LOGCAPTURE_WAIT", "AlwaysOn"),
        ("BACKUPIO", "Backup"),
        ("BACKUPBUFFER", "Backup"),
        // background/idle waits that would swamp every chart
        ("LAZYWRITER_SLEEP", IDLE_CATEGORY),
        ("SQLTRACE_INCREMENTAL_FLUSH_SLEEP", IDLE_CATEGORY),
        ("HADR_FILESTREAM_IOMGR_IOCOMPLETION", IDLE_CATEGORY),
        ("BROKER_TO_FLUSH", IDLE_CATEGORY),
        ("XE_TIMER_EVENT", IDLE_CATEGORY),
        ("DIRTY_PAGE_POLL", IDLE_CATEGORY),
        ("WAITFOR", IDLE_CATEGORY),
    ]
});

/// Shape of the user override file.
#[derive(Debug, Default, Deserialize)]
struct CategoryOverrides {
    /// Extra or replacement wait-type → category mappings
    #[serde(default)]
    categories: HashMap<String, String>,
    /// Categories to exclude from summaries, replacing the built-in set
    /// when present
    #[serde(default)]
    excluded: Option<Vec<String>>,
}

/// Mutable, lock-guarded (by the owner) wait-type → category table.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    map: HashMap<String, String>,
    excluded: HashSet<String>,
}

impl CategoryMap {
    /// Table with only the built-in base mappings.
    pub fn base() -> Self {
        let map = BASE_TABLE
            .iter()
            .map(|(w, c)| (w.to_string(), c.to_string()))
            .collect();
        let mut excluded = HashSet::new();
        excluded.insert(IDLE_CATEGORY.to_string());
        Self { map, excluded }
    }

    /// Base table merged with a YAML override file. A missing file is not an
    /// error; the base table is used unchanged.
    pub async fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut table = Self::base();
        let Some(path) = override_path else {
            return Ok(table);
        };
        if !path.exists() {
            return Ok(table);
        }

        let content = tokio::fs::read_to_string(path).await?;
        let overrides: CategoryOverrides = serde_yaml::from_str(&content)?;
        let n = overrides.categories.len();
        for (wait_type, category) in overrides.categories {
            table.map.insert(wait_type, category);
        }
        if let Some(excluded) = overrides.excluded {
            table.excluded = excluded.into_iter().collect();
        }
        info!("Loaded {} wait-category overrides from {:?}", n, path);
        Ok(table)
    }

    /// Category a wait type summarizes under. `None` means the type is
    /// mapped to an excluded category and must be dropped from the summary.
    /// An unmapped wait type is its own category.
    pub fn resolve<'a>(&'a self, wait_type: &'a str) -> Option<&'a str> {
        match self.map.get(wait_type) {
            Some(category) if self.excluded.contains(category) => None,
            Some(category) => Some(category.as_str()),
            None => Some(wait_type),
        }
    }

    /// True if the category is excluded from summaries.
    pub fn is_excluded(&self, category: &str) -> bool {
        self.excluded.contains(category)
    }

    /// Number of mapped wait types.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no mappings are present.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::base()
    }
}
