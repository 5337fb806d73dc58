//! Health check and status endpoints

use actix_web::{web, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;

/// Configure health check routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/status", web::get().to(system_status))
        .route("/version", web::get().to(version_info));
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
}

/// Basic liveness endpoint for load balancers and monitoring systems.
async fn health_check(_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Health check requested");
    Ok(HttpResponse::Ok().json(ApiResponse::success(HealthStatus {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })))
}

#[derive(Debug, Serialize)]
struct SystemStatus {
    timestamp: DateTime<Utc>,
    monitored_servers: usize,
    servers_failing: usize,
    log_entries: usize,
    labels: std::collections::HashMap<String, String>,
}

/// Fleet-level status: how many servers are monitored and how many are
/// currently failing their polls.
async fn system_status(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let snapshots = state.registry.clone_all();
    let failing = snapshots
        .iter()
        .filter(|s| !s.last_poll_error.is_empty())
        .count();

    Ok(HttpResponse::Ok().json(ApiResponse::success(SystemStatus {
        timestamp: Utc::now(),
        monitored_servers: snapshots.len(),
        servers_failing: failing,
        log_entries: state.log.len(),
        labels: state.config.monitor.labels.clone(),
    })))
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

/// Build metadata.
async fn version_info() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })))
}
