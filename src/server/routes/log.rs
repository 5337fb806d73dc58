//! Operational log endpoint

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Deserialize;

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;

/// Configure log routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/log", web::get().to(log_tail));
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    /// Maximum entries to return, newest first
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    200
}

/// Newest-first slice of the in-memory log ring.
async fn log_tail(
    state: web::Data<AppState>,
    query: web::Query<LogQuery>,
) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.log.tail(query.limit))))
}
