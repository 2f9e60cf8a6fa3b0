//! CSV encoder

use crate::config::DEFAULT_FULL_DATE_FORMAT;
use crate::error::{ExportError, ExportResult};
use crate::format::format_datetime;
use crate::types::{CellData, CellValue, ColumnSpec, NormalizedSheet};
use serde_json::Value;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text of a cell as written to CSV
pub fn cell_text(cell: &CellValue, spec: &ColumnSpec) -> String {
    match &cell.value {
        CellData::Time(dt) => format_datetime(
            dt,
            spec.format.as_deref().unwrap_or(DEFAULT_FULL_DATE_FORMAT),
        ),
        CellData::Number(n) => number_text(*n),
        CellData::Boolean(b) => b.to_string(),
        CellData::Text(s) => s.clone(),
        CellData::Raw(Value::Null) => String::new(),
        CellData::Raw(Value::String(s)) => s.clone(),
        CellData::Raw(other) => other.to_string(),
    }
}

fn number_text(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

/// Header of visible column names, then one row per cell index.
/// Hidden columns are left out; short columns are padded with empty fields.
pub fn encode_csv(sheet: &NormalizedSheet) -> ExportResult<Vec<u8>> {
    let columns: Vec<_> = sheet.visible_columns().collect();

    let mut writer = ::csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(UTF8_BOM.to_vec());

    if !columns.is_empty() {
        writer.write_record(columns.iter().map(|c| c.spec.name.as_str()))?;

        for row in 0..sheet.row_count() {
            let record: Vec<String> = columns
                .iter()
                .map(|c| {
                    c.cells
                        .get(row)
                        .map(|cell| cell_text(cell, &c.spec))
                        .unwrap_or_default()
                })
                .collect();
            writer.write_record(&record)?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}
