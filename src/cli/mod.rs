//! CLI command handlers

pub mod commands;

pub use commands::{build_service, export, inspect, parse_panel_ids, write_artifact, ExportArgs};
