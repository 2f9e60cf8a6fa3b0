//! Encoders for normalized sheets
//!
//! - CSV: one BOM-prefixed file
//! - ZIP: one CSV per exported panel
//! - XLSX: one worksheet per exported panel, styled

mod csv;
mod naming;
mod xlsx;
mod zip;

pub use self::csv::{cell_text, encode_csv};
pub use self::naming::{export_file_name, sanitize_file_component, SheetNamer};
pub use self::xlsx::{XlsxEncoder, IMAGE_HEIGHT, IMAGE_WIDTH};
pub use self::zip::{encode_zip, zip_entry_name};

use crate::types::NormalizedSheet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Zip,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Zip => "zip",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Zip => "application/zip",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// What a worksheet / zip entry holds for one panel
#[derive(Debug, Clone, PartialEq)]
pub enum SheetContent {
    Table(NormalizedSheet),
    /// Rendered PNG of a non-tabular panel
    Image(Vec<u8>),
}

/// One exported panel
#[derive(Debug, Clone, PartialEq)]
pub struct SheetItem {
    pub title: String,
    pub content: SheetContent,
}

impl SheetItem {
    pub fn table(title: impl Into<String>, sheet: NormalizedSheet) -> Self {
        Self {
            title: title.into(),
            content: SheetContent::Table(sheet),
        }
    }

    pub fn image(title: impl Into<String>, png: Vec<u8>) -> Self {
        Self {
            title: title.into(),
            content: SheetContent::Image(png),
        }
    }
}

/// A finished export file
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}
