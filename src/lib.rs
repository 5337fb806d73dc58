//! # sqlfleet
//!
//! A SQL Server fleet monitor: one lightweight polling task per monitored
//! instance feeds bounded in-memory ring buffers (counter rates, wait-stat
//! deltas, an operational log), and an HTTP JSON API serves cloned
//! snapshots of that state to dashboards.
//!
//! ## Design in one paragraph
//!
//! Each server's poll loop ticks every 10 seconds: a cheap quick poll
//! (identity, properties, availability groups) runs every tick, a full
//! metric collection at most every 51 seconds. Successive counter values
//! become per-second rates, successive wait-stat captures become
//! categorized per-minute deltas; both land in fixed-capacity rings that
//! evict the oldest sample on overflow. Readers never touch live state:
//! the registry hands out deep clones taken under a momentary lock.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> sqlfleet::Result<()> {
//!     sqlfleet::server::run_server(Path::new("config/sqlfleet.yaml")).await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use core::registry::{ServerRegistry, ServerState};
pub use core::ring::{LogRing, RingBuffer, TimedRing};
pub use utils::error::{MonitorError, Result};
