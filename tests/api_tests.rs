//! API integration tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use async_trait::async_trait;
use axum::Router;
use panel_export::acquire::{FileImageRenderer, ImageRenderer};
use panel_export::api::{router, AppState};
use panel_export::dashboard::Panel;
use panel_export::{ExportConfig, ExportResult, ExportService};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const SNAPSHOT: &str = r#"
title: Billing
panels:
  - id: inv
    title: Invoices
    tables:
      - fields:
          - { name: invoice, type: string, values: [I-1, I-2] }
          - { name: paid, type: boolean, values: [true, false] }
  - id: trend
    title: Trend
    type: timeseries
"#;

fn app() -> Router {
    let service = Arc::new(ExportService::new(
        ExportConfig::default(),
        Arc::new(FileImageRenderer::new("/nonexistent")),
    ));
    service.start();
    router(Arc::new(AppState::new(service)))
}

/// 1x1 transparent PNG
const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Renderer that answers only after a delay
struct SlowRenderer(Duration);

#[async_trait]
impl ImageRenderer for SlowRenderer {
    async fn render(&self, _panel: &Panel) -> ExportResult<Vec<u8>> {
        tokio::time::sleep(self.0).await;
        Ok(PNG.to_vec())
    }
}

fn slow_app(delay: Duration) -> Router {
    let service = Arc::new(ExportService::new(
        ExportConfig::default(),
        Arc::new(SlowRenderer(delay)),
    ));
    service.start();
    router(Arc::new(AppState::new(service)))
}

fn export_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/export")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn write_snapshot(dir: &Path) -> PathBuf {
    let path = dir.join("billing.yaml");
    std::fs::write(&path, SNAPSHOT).unwrap();
    path
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (status, body) = get(app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["request_id"].as_str().unwrap().len(), 36);

    let paths: Vec<&str> = body["data"]["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"/api/v1/export"));
    assert!(paths.contains(&"/api/v1/inspect"));
}

#[tokio::test]
async fn test_health_and_version() {
    let (_, health) = get(app(), "/health").await;
    assert_eq!(health["data"]["status"], "healthy");

    let (_, version) = get(app(), "/version").await;
    assert_eq!(version["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(version["data"]["formats"], json!(["csv", "zip", "xlsx"]));
}

#[tokio::test]
async fn test_status_starts_idle() {
    let (status, body) = get(app(), "/api/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "idle");
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPORT ENDPOINT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_export_csv() {
    let dir = TempDir::new().unwrap();
    let dashboard = write_snapshot(dir.path());
    let out = dir.path().join("out");

    let (status, body) = post(
        app(),
        "/api/v1/export",
        json!({
            "dashboard_path": dashboard,
            "format": "csv",
            "panels": ["inv"],
            "output_dir": out,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["format"], "csv");
    let path = body["data"]["file_path"].as_str().unwrap();
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(
        String::from_utf8(bytes[3..].to_vec()).unwrap(),
        "invoice,paid\nI-1,true\nI-2,false\n"
    );
}

#[tokio::test]
async fn test_export_image_failure_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let dashboard = write_snapshot(dir.path());
    let app = app();

    let (status, body) = post(
        app.clone(),
        "/api/v1/export",
        json!({
            "dashboard_path": dashboard,
            "format": "xlsx",
            "output_dir": dir.path().join("out"),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());
    assert!(!dir.path().join("out").exists());

    let (_, session) = get(app, "/api/v1/status").await;
    assert_eq!(session["data"]["state"], "failed");
}

#[tokio::test]
async fn test_dropped_export_request_still_settles_session() {
    let dir = TempDir::new().unwrap();
    let dashboard = write_snapshot(dir.path());
    let out = dir.path().join("out");
    let app = slow_app(Duration::from_millis(300));

    // Client gives up while the image is still rendering
    let dropped = tokio::time::timeout(
        Duration::from_millis(100),
        app.clone().oneshot(export_request(json!({
            "dashboard_path": dashboard,
            "format": "xlsx",
            "output_dir": out,
        }))),
    )
    .await;
    assert!(dropped.is_err());

    let mut state = Value::Null;
    for _ in 0..40 {
        let (_, session) = get(app.clone(), "/api/v1/status").await;
        state = session["data"]["state"].clone();
        if state != "exporting" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(state, "idle");
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);

    let (status, _) = post(
        app,
        "/api/v1/export",
        json!({
            "dashboard_path": dashboard,
            "format": "csv",
            "panels": ["inv"],
            "output_dir": out,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_export_unknown_panel_is_not_found() {
    let dir = TempDir::new().unwrap();
    let dashboard = write_snapshot(dir.path());

    let (status, body) = post(
        app(),
        "/api/v1/export",
        json!({
            "dashboard_path": dashboard,
            "format": "zip",
            "panels": ["nope"],
            "output_dir": dir.path(),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_export_missing_dashboard() {
    let (status, body) = post(
        app(),
        "/api/v1/export",
        json!({
            "dashboard_path": "/nonexistent/dash.yaml",
            "format": "csv",
            "output_dir": "/tmp",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

// ═══════════════════════════════════════════════════════════════════════════
// INSPECT ENDPOINT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_inspect_panel() {
    let dir = TempDir::new().unwrap();
    let dashboard = write_snapshot(dir.path());

    let (status, body) = post(
        app(),
        "/api/v1/inspect",
        json!({ "dashboard_path": dashboard, "panel": "inv" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let columns = body["data"]["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0]["key"], "0");
    assert_eq!(columns[1]["spec"]["field_type"], "boolean");
    assert_eq!(columns[1]["cells"][0]["value"], json!({"kind": "boolean", "value": true}));
}
