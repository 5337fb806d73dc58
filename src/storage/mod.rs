//! Best-effort disk persistence
//!
//! Nothing here is durable state: the monitor rebuilds everything from
//! polling after a restart. The snapshot cache only pre-populates rings so
//! dashboards are not empty for the first hour after a restart.

pub mod cache;
