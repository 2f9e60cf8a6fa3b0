//! Panel Export API server implementation
//!
//! HTTP REST API server using Axum for export automation.
//! Provides endpoints for export, inspect and session status.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::handlers;
use crate::service::ExportService;
use crate::session::ExportSession;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub service: Arc<ExportService>,
    /// One export at a time; a second request while exporting is rejected
    pub session: Mutex<ExportSession>,
}

impl AppState {
    pub fn new(service: Arc<ExportService>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            service,
            session: Mutex::new(ExportSession::new()),
        }
    }
}

/// Routes and middleware, without binding a listener
pub fn router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route("/api/v1/status", get(handlers::status))
        .route("/api/v1/export", post(handlers::export))
        .route("/api/v1/inspect", post(handlers::inspect))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server until SIGINT/SIGTERM, then shut the service down
pub async fn run_api_server(config: ApiConfig, service: Arc<ExportService>) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "panel_export=info,tower_http=info".into()),
        )
        .init();

    service.start();
    let app = router(Arc::new(AppState::new(Arc::clone(&service))));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("📦 Panel Export API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/export, /api/v1/inspect, /api/v1/status");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    service.shutdown();
    served?;
    info!("Panel Export API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
