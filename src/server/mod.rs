//! HTTP server
//!
//! Read-only JSON API over the registry's cloned snapshots. Handlers never
//! hold a server-state lock beyond the instant of copy.

pub mod builder;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
mod tests;

pub use builder::run_server;
pub use server::HttpServer;
pub use state::AppState;
