//! Panel Export API server module
//!
//! Provides the HTTP REST API for export automation.
//! Run with `panel-export-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
