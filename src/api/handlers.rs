//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::acquire::SnapshotSource;
use crate::cli::write_artifact;
use crate::dashboard::load_snapshot;
use crate::error::{ExportError, ExportResult};
use crate::export::{ExportArtifact, ExportFormat};
use crate::session::ExportState;
use crate::types::NormalizedSheet;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// HTTP status for a failed export or inspect
pub fn status_for(error: &ExportError) -> StatusCode {
    match error {
        ExportError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ExportError::UnknownPanel(_) => StatusCode::NOT_FOUND,
        ExportError::Yaml(_)
        | ExportError::Json(_)
        | ExportError::Parse(_)
        | ExportError::Validation(_) => StatusCode::BAD_REQUEST,
        ExportError::InvalidTransition(_) => StatusCode::CONFLICT,
        ExportError::AcquisitionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ExportError::Acquisition { .. } | ExportError::ImageFetch { .. } | ExportError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure<T: Serialize>(error: ExportError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = status_for(&error);
    warn!(%status, error = %error, "request failed");
    (status, Json(ApiResponse::err(error.to_string())))
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(method: &str, path: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Panel Export API Server".to_string(),
        version: state.version.clone(),
        description: "HTTP API for exporting dashboard panels to CSV, ZIP and XLSX".to_string(),
        endpoints: vec![
            endpoint("GET", "/health", "Health check endpoint"),
            endpoint("GET", "/version", "Get server version"),
            endpoint("GET", "/api/v1/status", "State of the export session"),
            endpoint("POST", "/api/v1/export", "Export dashboard panels to a file"),
            endpoint("POST", "/api/v1/inspect", "Normalized sheet of dashboard panels"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service_running: bool,
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let running = state.service.is_running();
    Json(ApiResponse::ok(HealthResponse {
        status: if running { "healthy" } else { "stopping" }.to_string(),
        service_running: running,
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub formats: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        formats: [ExportFormat::Csv, ExportFormat::Zip, ExportFormat::Xlsx]
            .iter()
            .map(ToString::to_string)
            .collect(),
    }))
}

/// GET /api/v1/status - Export session state
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(ApiResponse::ok(session.state().clone()))
}

/// Export request
#[derive(Deserialize)]
pub struct ExportRequest {
    pub dashboard_path: String,
    pub format: ExportFormat,
    /// Panel ids; empty means all panels
    #[serde(default)]
    pub panels: Vec<String>,
    pub output_dir: String,
}

/// Export response
#[derive(Serialize)]
pub struct ExportResponse {
    pub file_path: String,
    pub file_name: String,
    pub format: ExportFormat,
    pub mime_type: String,
    pub bytes: usize,
}

/// POST /api/v1/export - Export panels to a file in `output_dir`
pub async fn export(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExportRequest>,
) -> (StatusCode, Json<ApiResponse<ExportResponse>>) {
    {
        let mut session = state.session.lock().await;
        let begun = session
            .select(req.panels.clone())
            .and_then(|()| session.begin(req.format));
        if let Err(e) = begun {
            return failure(e);
        }
    }

    // Detached so a dropped request still settles the session
    let task_state = Arc::clone(&state);
    let task = tokio::spawn(async move {
        let result = run_export(&task_state, &req).await;
        settle(&task_state, &result).await;
        result
    });

    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            let result: ExportResult<(ExportArtifact, PathBuf)> =
                Err(ExportError::Validation(format!("export task failed: {}", e)));
            settle(&state, &result).await;
            result
        }
    };

    match result {
        Ok((artifact, path)) => (
            StatusCode::OK,
            Json(ApiResponse::ok(ExportResponse {
                file_path: path.display().to_string(),
                file_name: artifact.file_name.clone(),
                format: artifact.format,
                mime_type: artifact.mime_type().to_string(),
                bytes: artifact.bytes.len(),
            })),
        ),
        Err(e) => failure(e),
    }
}

/// Move the session out of `Exporting` once the export has finished
async fn settle<T>(state: &AppState, result: &ExportResult<T>) {
    let mut session = state.session.lock().await;
    let finished = match result {
        Ok(_) => session.complete(),
        Err(e) => session.fail(e.to_string()),
    };
    if let Err(e) = finished {
        warn!(error = %e, "export session out of sync");
    }
}

async fn run_export(
    state: &AppState,
    req: &ExportRequest,
) -> ExportResult<(ExportArtifact, PathBuf)> {
    let snapshot = load_snapshot(&PathBuf::from(&req.dashboard_path))?;
    let source = SnapshotSource::new(snapshot.data);
    let artifact = state
        .service
        .export(
            &snapshot.dashboard,
            &source,
            &req.panels,
            req.format,
            Utc::now(),
        )
        .await?;
    let path = write_artifact(&artifact, &PathBuf::from(&req.output_dir))?;
    Ok((artifact, path))
}

/// Inspect request
#[derive(Deserialize)]
pub struct InspectRequest {
    pub dashboard_path: String,
    /// Single panel id; all panels merged when absent
    #[serde(default)]
    pub panel: Option<String>,
}

/// POST /api/v1/inspect - Normalized sheet of a dashboard
pub async fn inspect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InspectRequest>,
) -> (StatusCode, Json<ApiResponse<NormalizedSheet>>) {
    let result = async {
        let snapshot = load_snapshot(&PathBuf::from(&req.dashboard_path))?;
        let source = SnapshotSource::new(snapshot.data);
        state
            .service
            .inspect(&snapshot.dashboard, &source, req.panel.as_deref())
            .await
    }
    .await;

    match result {
        Ok(sheet) => (StatusCode::OK, Json(ApiResponse::ok(sheet))),
        Err(e) => failure(e),
    }
}
