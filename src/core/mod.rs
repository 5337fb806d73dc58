//! Monitor core
//!
//! Ring buffers, accumulators, the per-server polling scheduler, and the
//! registry that ties them together.

pub mod metrics;
pub mod poller;
pub mod registry;
pub mod ring;
pub mod sql;
pub mod waits;
