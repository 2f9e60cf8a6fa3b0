//! Panel Export API Server binary
//!
//! HTTP REST API for exporting dashboard panels.

use clap::Parser;
use panel_export::api::{run_api_server, ApiConfig};
use panel_export::cli::build_service;
use panel_export::ExportConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "panel-export-server")]
#[command(version)]
#[command(about = "Panel Export API Server - HTTP REST API for dashboard panel exports")]
#[command(long_about = r#"
Panel Export API Server - HTTP REST API

Provides RESTful endpoints for export automation:
  - POST /api/v1/export    - Export panels to CSV, ZIP or XLSX
  - POST /api/v1/inspect   - Normalized sheet as JSON
  - GET  /api/v1/status    - Export session state

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

Features:
  - One export at a time (409 while busy)
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON response format with request IDs
  - Tracing and structured logging

Example usage:
  panel-export-server                           # Start on localhost:8080
  panel-export-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/export \
    -H "Content-Type: application/json" \
    -d '{"dashboard_path": "dashboard.yaml", "format": "xlsx", "output_dir": "out"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "PANEL_EXPORT_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PANEL_EXPORT_PORT")]
    port: u16,

    /// Export configuration (YAML)
    #[arg(short, long, env = "PANEL_EXPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Read graph panel images from <DIR>/<panel id>.png instead of fetching image_url
    #[arg(long)]
    images_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let export_config = ExportConfig::load_or_default(args.config.as_deref())?;
    let service = Arc::new(build_service(export_config, args.images_dir.as_deref())?);

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config, service).await
}
