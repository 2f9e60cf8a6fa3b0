//! Panel Export - dashboard panel data to CSV, ZIP and XLSX
//!
//! This library turns the query results of dashboard panels into
//! spreadsheet-ready files.
//!
//! # Features
//!
//! - Positional merging of heterogeneous result tables into one sheet
//! - Threshold colors, contrast-aware background fills and cell hyperlinks
//! - Moment-style date formats, rendered for CSV and translated for Excel
//! - CSV (UTF-8 BOM), ZIP of per-panel CSVs, styled XLSX with panel images
//! - Bounded waiting on streaming query results
//!
//! # Example
//!
//! ```no_run
//! use panel_export::acquire::{FileImageRenderer, SnapshotSource};
//! use panel_export::dashboard::load_snapshot;
//! use panel_export::export::ExportFormat;
//! use panel_export::{ExportConfig, ExportService};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> panel_export::ExportResult<()> {
//! let snapshot = load_snapshot(Path::new("dashboard.yaml"))?;
//! let source = SnapshotSource::new(snapshot.data);
//!
//! let service = ExportService::new(ExportConfig::default(), Arc::new(FileImageRenderer::new("png")));
//! service.start();
//! let artifact = service
//!     .export(&snapshot.dashboard, &source, &[], ExportFormat::Xlsx, chrono::Utc::now())
//!     .await?;
//! println!("{} ({} bytes)", artifact.file_name, artifact.bytes.len());
//! service.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod acquire;
pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod format;
pub mod presenter;
pub mod service;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use format::{normalize, SheetFormatter};
pub use service::ExportService;
pub use session::{ExportSession, ExportState};
pub use types::{CellValue, Field, FieldType, NormalizedSheet, ResultTable};
