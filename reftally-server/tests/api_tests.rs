//! Integration tests for the referee tally HTTP API
//!
//! Tests the complete API surface: health, device scan, configuration
//! lifecycle, contestant tagging, score snapshots, and the report.

use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

use reftally_common::events::EventBus;
use reftally_server::api::{build_router, AppState};
use reftally_server::context::ScoringContext;
use reftally_server::device::SimHub;
use reftally_server::storage::EventLogWriter;

/// Test helper to build a router over a fresh context
fn test_router(dir: &std::path::Path, devices: &[&str]) -> axum::Router {
    let hub = SimHub::new();
    for device in devices {
        hub.register(device);
    }
    let ctx = Arc::new(ScoringContext::new(
        Arc::new(hub),
        EventBus::new(64),
        EventLogWriter::new(dir),
    ));
    build_router(AppState { ctx })
}

/// Helper function to make HTTP requests to the test server
async fn make_request(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    use axum::body::Body;
    use http::{Method, Request};
    use tower::ServiceExt;

    let method = match method {
        "GET" => Method::GET,
        "POST" => Method::POST,
        _ => panic!("Unsupported method"),
    };

    let mut request = Request::builder().method(method).uri(path);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = match body {
        Some(json_body) => request.body(Body::from(json_body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };

    (status, json_body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path(), &[]);

    let (status, body) = make_request(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.expect("Expected response body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "reftally-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_scan_lists_registered_devices() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path(), &["Counter-B", "Counter-A"]);

    let (status, body) = make_request(&app, "GET", "/scan", None).await;

    assert_eq!(status, StatusCode::OK);
    let devices = body.unwrap();
    let ids: Vec<&str> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["Counter-A", "Counter-B"]);
}

#[tokio::test]
async fn test_setup_scores_teardown_flow() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path(), &["Counter-A"]);

    let setup = json!({
        "group": "finals",
        "referees": [{ "index": 0, "primary": "Counter-A" }]
    });
    let (status, body) = make_request(&app, "POST", "/setup", Some(setup)).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["group"], "finals");
    assert_eq!(body["referees"][0]["index"], 0);
    assert_eq!(body["referees"][0]["mode"], "single");
    assert_eq!(body["referees"][0]["primary"], "Counter-A");
    assert_eq!(body["referees"][0]["secondary"], Value::Null);

    // Configured slots report a zero score until events arrive.
    let (status, body) = make_request(&app, "GET", "/scores", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["0"], json!({ "total": 0, "plus": 0, "minus": 0 }));

    let (status, body) = make_request(&app, "POST", "/teardown", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["status"], "ok");

    let (status, body) = make_request(&app, "GET", "/scores", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({}));
}

#[tokio::test]
async fn test_setup_rejects_duplicate_indices() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path(), &["Counter-A"]);

    let setup = json!({
        "group": "finals",
        "referees": [{ "index": 0 }, { "index": 0 }]
    });
    let (status, body) = make_request(&app, "POST", "/setup", Some(setup)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body.unwrap()["error"].as_str().unwrap().to_string();
    assert!(error.contains("duplicate"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_setup_leaves_unknown_devices_unbound() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path(), &["Counter-A"]);

    let setup = json!({
        "group": "finals",
        "referees": [{ "index": 2, "primary": "Counter-MISSING" }]
    });
    let (status, body) = make_request(&app, "POST", "/setup", Some(setup)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["referees"][0]["primary"], Value::Null);
}

#[tokio::test]
async fn test_contestant_update() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path(), &[]);

    let (status, body) =
        make_request(&app, "POST", "/contestant", Some(json!({ "name": "Lee" }))).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["contestant"], "Lee");
}

#[tokio::test]
async fn test_reset_without_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path(), &[]);

    let (status, body) = make_request(&app, "POST", "/reset", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["results"], json!({}));
}

#[tokio::test]
async fn test_report_reads_logged_results() {
    let dir = tempfile::tempdir().unwrap();

    // Seed a finished group the way the live service writes it.
    let group_dir = dir.path().join("finals");
    std::fs::create_dir_all(&group_dir).unwrap();
    std::fs::write(
        group_dir.join("referee_0_PRIMARY.csv"),
        "SystemTime,BLE_Timestamp,DeviceRole,Contestant,CurrentTotal,EventType,TotalPlus,TotalMinus\n\
         2026-03-01 09:30:15.250,100,PRIMARY,Lee,1,1,1,0\n\
         2026-03-01 09:30:16.250,900,PRIMARY,Lee,3,1,4,1\n",
    )
    .unwrap();

    let app = test_router(dir.path(), &[]);
    let (status, body) = make_request(&app, "GET", "/report", None).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.unwrap();
    assert_eq!(rows[0]["group"], "finals");
    assert_eq!(rows[0]["contestant"], "Lee");
    assert_eq!(rows[0]["scores"]["0"], json!({ "total": 3, "plus": 4, "minus": 1 }));
}
