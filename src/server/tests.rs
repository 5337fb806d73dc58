//! HTTP API tests

use std::sync::Arc;

use actix_web::{test, web, App};
use parking_lot::RwLock;
use serde_json::Value;
use tempfile::TempDir;

use crate::config::Config;
use crate::core::poller::PollSettings;
use crate::core::registry::ServerRegistry;
use crate::core::ring::LogRing;
use crate::core::sql::{ConnectionDescriptor, SimulatedFactory};
use crate::core::waits::CategoryMap;
use crate::server::routes;
use crate::server::state::AppState;

struct Fixture {
    state: AppState,
    _dirs: (TempDir, TempDir),
}

fn fixture() -> Fixture {
    let journal_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let log = Arc::new(LogRing::new(100));
    // 1s interval: the startup jitter is bounded by one interval, so the
    // first full collection lands quickly
    let settings = PollSettings {
        poll_interval_secs: 1,
        ..PollSettings::default()
    };
    let registry = Arc::new(ServerRegistry::new(
        Arc::new(SimulatedFactory),
        Arc::new(RwLock::new(CategoryMap::base())),
        log.clone(),
        settings,
        journal_dir.path(),
        Some(cache_dir.path().to_path_buf()),
        60,
    ));
    Fixture {
        state: AppState::new(Arc::new(Config::default()), registry, log),
        _dirs: (journal_dir, cache_dir),
    }
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(routes::health::configure_routes)
                .configure(routes::servers::configure_routes)
                .configure(routes::log::configure_routes),
        )
        .await
    };
}

async fn add_server(fixture: &Fixture, key: &str, display_name: &str) {
    fixture
        .state
        .registry
        .add(key, display_name, "corp", ConnectionDescriptor::default())
        .await
        .unwrap();
    // first quick poll resolves the identity
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
}

/// Waits past the startup jitter so the first full collection has run.
async fn wait_for_big_poll() {
    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
}

#[actix_web::test]
async fn test_health_endpoint() {
    let f = fixture();
    let app = app!(f.state.clone());

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[actix_web::test]
async fn test_list_servers_empty() {
    let f = fixture();
    let app = app!(f.state.clone());

    let req = test::TestRequest::get().uri("/api/servers").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_list_servers_populated_and_sorted() {
    let f = fixture();
    add_server(&f, "zeta", "Zeta").await;
    add_server(&f, "alpha", "Alpha").await;
    let app = app!(f.state.clone());

    let req = test::TestRequest::get().uri("/api/servers").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;

    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["display_name"], "Alpha");
    assert_eq!(rows[1]["display_name"], "Zeta");
    assert_eq!(rows[0]["server_name"], "ALPHA");
}

#[actix_web::test]
async fn test_server_detail_and_unknown_key() {
    let f = fixture();
    add_server(&f, "sql01", "SQL01").await;
    let app = app!(f.state.clone());

    let req = test::TestRequest::get().uri("/api/servers/sql01").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["key"], "sql01");
    assert_eq!(body["data"]["domain"], "corp");

    let req = test::TestRequest::get().uri("/api/servers/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[actix_web::test]
async fn test_status_counts_monitored_servers() {
    let f = fixture();
    add_server(&f, "sql01", "SQL01").await;
    let app = app!(f.state.clone());

    let req = test::TestRequest::get().uri("/status").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["monitored_servers"], 1);
    assert_eq!(body["data"]["servers_failing"], 0);
}

#[actix_web::test]
async fn test_log_tail() {
    let f = fixture();
    add_server(&f, "sql01", "SQL01").await;
    f.state.log.info("manual entry");
    let app = app!(f.state.clone());

    let req = test::TestRequest::get().uri("/api/log?limit=1").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;

    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    // newest first
    assert_eq!(entries[0]["message"], "manual entry");
}

#[actix_web::test]
async fn test_metric_endpoints() {
    let f = fixture();
    add_server(&f, "sql01", "SQL01").await;
    wait_for_big_poll().await;
    let app = app!(f.state.clone());

    let req = test::TestRequest::get()
        .uri("/api/servers/sql01/metrics")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let names = body["data"].as_array().unwrap();
    assert!(names.iter().any(|n| n == "batch_requests"));

    let req = test::TestRequest::get()
        .uri("/api/servers/sql01/metrics/batch_requests")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert!(!body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_wait_endpoints() {
    let f = fixture();
    add_server(&f, "sql01", "SQL01").await;
    wait_for_big_poll().await;
    let app = app!(f.state.clone());

    let req = test::TestRequest::get()
        .uri("/api/servers/sql01/waits")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert!(!body["data"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/servers/sql01/waits/top?n=2")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"].as_array().unwrap().len() <= 2);
}
