//! ZIP container of per-panel CSV files

use super::csv::encode_csv;
use super::naming::sanitize_file_component;
use super::{SheetContent, SheetItem};
use crate::error::ExportResult;
use crate::types::NormalizedSheet;
use std::io::{Cursor, Write};
use tracing::debug;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipWriter};

/// `<index>-<title>-data-<timestamp>.csv`, index 1-based
pub fn zip_entry_name(index: usize, title: &str, timestamp: &str) -> String {
    format!(
        "{}-{}-data-{}.csv",
        index,
        sanitize_file_component(title),
        sanitize_file_component(timestamp)
    )
}

/// One CSV entry per item. Image items have no tabular data and get an empty CSV.
pub fn encode_zip(items: &[SheetItem], timestamp: &str) -> ExportResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let empty = NormalizedSheet::new();

    for (idx, item) in items.iter().enumerate() {
        let name = zip_entry_name(idx + 1, &item.title, timestamp);
        let sheet = match &item.content {
            SheetContent::Table(sheet) => sheet,
            SheetContent::Image(_) => &empty,
        };
        debug!(entry = %name, columns = sheet.len(), "adding zip entry");

        writer.start_file(name, options)?;
        writer.write_all(&encode_csv(sheet)?)?;
    }

    Ok(writer.finish()?.into_inner())
}
