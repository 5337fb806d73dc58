//! Server snapshot endpoints
//!
//! Everything here reads cloned state: the poll loops are never blocked for
//! longer than the copy itself.

use actix_web::{web, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::registry::ServerState;
use crate::core::waits::top_groups;
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;

/// Configure server snapshot routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/servers")
            .route("", web::get().to(list_servers))
            .route("/unique", web::get().to(list_unique_servers))
            .route("/{key}", web::get().to(server_detail))
            .route("/{key}/metrics", web::get().to(metric_names))
            .route("/{key}/metrics/{metric}", web::get().to(metric_series))
            .route("/{key}/waits", web::get().to(wait_history))
            .route("/{key}/waits/top", web::get().to(wait_top_groups)),
    );
}

/// One row of the fleet overview.
#[derive(Debug, Serialize)]
struct ServerSummary {
    key: String,
    display_name: String,
    domain: String,
    server_name: Option<String>,
    polling: bool,
    last_poll_success: Option<DateTime<Utc>>,
    last_poll_fail: Option<DateTime<Utc>>,
    last_poll_error: String,
    poll_duration_ms: i64,
    sort_priority: u8,
}

impl From<ServerState> for ServerSummary {
    fn from(state: ServerState) -> Self {
        Self {
            key: state.key,
            display_name: state.display_name,
            domain: state.domain,
            server_name: state.server_name,
            polling: state.polling,
            last_poll_success: state.last_poll_success,
            last_poll_fail: state.last_poll_fail,
            last_poll_error: state.last_poll_error,
            poll_duration_ms: state.poll_duration_ms,
            sort_priority: state.sort_priority,
        }
    }
}

/// All servers in display order: healthy first, then alphabetical.
async fn list_servers(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let mut snapshots = state.registry.clone_all();
    snapshots.sort_by_key(|s| s.sort_key());
    let summaries: Vec<ServerSummary> = snapshots.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(summaries)))
}

/// Servers de-duplicated by (domain, resolved name).
async fn list_unique_servers(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let summaries: Vec<ServerSummary> = state
        .registry
        .clone_unique()
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(summaries)))
}

/// Full cloned state for one server, rings included.
async fn server_detail(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<HttpResponse> {
    debug!("Server detail requested for {}", key);
    match state.registry.clone_one(&key) {
        Some(snapshot) => Ok(HttpResponse::Ok().json(ApiResponse::success(snapshot))),
        None => Ok(not_found(&key)),
    }
}

/// Names of the metrics tracked for one server.
async fn metric_names(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match state.registry.clone_one(&key) {
        Some(snapshot) => {
            let mut names: Vec<String> = snapshot
                .metrics
                .metric_names()
                .into_iter()
                .map(String::from)
                .collect();
            names.sort();
            Ok(HttpResponse::Ok().json(ApiResponse::success(names)))
        }
        None => Ok(not_found(&key)),
    }
}

/// Chronological samples for one metric.
async fn metric_series(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (key, metric) = path.into_inner();
    match state.registry.clone_one(&key) {
        Some(snapshot) => {
            let series = snapshot.metrics.values(&metric);
            Ok(HttpResponse::Ok().json(ApiResponse::success(series)))
        }
        None => Ok(not_found(&key)),
    }
}

/// Wait snapshots inside the trailing retention window.
async fn wait_history(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match state.registry.clone_one(&key) {
        Some(snapshot) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(snapshot.waits.values())))
        }
        None => Ok(not_found(&key)),
    }
}

#[derive(Debug, Deserialize)]
struct TopGroupsQuery {
    /// Number of categories to return
    #[serde(default = "default_top_n")]
    n: usize,
}

fn default_top_n() -> usize {
    5
}

/// Top wait categories across the retention window, for chart series
/// selection.
async fn wait_top_groups(
    state: web::Data<AppState>,
    key: web::Path<String>,
    query: web::Query<TopGroupsQuery>,
) -> ActixResult<HttpResponse> {
    match state.registry.clone_one(&key) {
        Some(snapshot) => {
            let groups = top_groups(&snapshot.waits.values(), query.n);
            Ok(HttpResponse::Ok().json(ApiResponse::success(groups)))
        }
        None => Ok(not_found(&key)),
    }
}

fn not_found(key: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error(format!("unknown server: {}", key)))
}
