//! XLSX encoder
//!
//! One worksheet per exported panel. Tabular panels get a bold header row,
//! thin borders on every cell, per-column alignment, width and date format,
//! and per-cell font color, solid fill and hyperlinks. Non-tabular panels get
//! their rendered image at A1.

use super::naming::SheetNamer;
use super::{SheetContent, SheetItem};
use crate::config::DEFAULT_FULL_DATE_FORMAT;
use crate::error::{ExportError, ExportResult};
use crate::format::contrast::parse_hex_color;
use crate::format::DateFormat;
use crate::types::{Alignment, CellData, CellValue, ColumnSpec, FieldType, NormalizedSheet};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, Image, Url, Workbook, Worksheet,
};
use serde_json::Value;
use tracing::{debug, warn};

pub const IMAGE_WIDTH: u32 = 1000;
pub const IMAGE_HEIGHT: u32 = 500;

/// Days between 1899-12-30 (Excel epoch) and 1970-01-01
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// XLSX encoder for exported panels
#[derive(Debug, Clone, Default)]
pub struct XlsxEncoder {
    /// Fallback format for time columns without one
    full_date_format: Option<String>,
}

impl XlsxEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_full_date_format(mut self, format: impl Into<String>) -> Self {
        self.full_date_format = Some(format.into());
        self
    }

    /// Encode all items into one workbook
    pub fn encode(&self, items: &[SheetItem]) -> ExportResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let mut namer = SheetNamer::new();

        for item in items {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(namer.next_name(&item.title))?;

            match &item.content {
                SheetContent::Table(sheet) => self.write_table(worksheet, sheet)?,
                SheetContent::Image(png) => Self::write_image(worksheet, png)?,
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn write_image(worksheet: &mut Worksheet, png: &[u8]) -> ExportResult<()> {
        let image = Image::new_from_buffer(png)?.set_scale_to_size(
            IMAGE_WIDTH,
            IMAGE_HEIGHT,
            false,
        );
        worksheet.insert_image(0, 0, &image)?;
        Ok(())
    }

    /// Write a normalized sheet: header row, then data rows
    fn write_table(&self, worksheet: &mut Worksheet, sheet: &NormalizedSheet) -> ExportResult<()> {
        let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);

        for (col_idx, column) in sheet.columns.iter().enumerate() {
            let col = u16::try_from(col_idx)
                .map_err(|_| ExportError::Validation(format!("too many columns: {}", col_idx)))?;
            let spec = &column.spec;

            worksheet.write_string_with_format(0, col, &spec.name, &header_format)?;
            worksheet.set_column_width_pixels(col, u16::try_from(spec.width).unwrap_or(u16::MAX))?;
            if spec.hidden {
                worksheet.set_column_hidden(col)?;
            }

            let base = self.column_format(spec);
            for row_idx in 0..sheet.row_count() {
                let row = u32::try_from(row_idx + 1)
                    .map_err(|_| ExportError::Validation(format!("too many rows: {}", row_idx)))?;
                match column.cells.get(row_idx) {
                    Some(cell) => Self::write_cell(worksheet, row, col, cell, &base)?,
                    None => {
                        worksheet.write_blank(row, col, &base)?;
                    }
                }
            }
        }

        debug!(
            columns = sheet.len(),
            rows = sheet.row_count(),
            "wrote worksheet"
        );
        Ok(())
    }

    /// Border, alignment and (for time columns) number format shared by a column
    fn column_format(&self, spec: &ColumnSpec) -> Format {
        let mut format = Format::new().set_border(FormatBorder::Thin);

        format = match spec.align {
            Some(Alignment::Left) => format.set_align(FormatAlign::Left),
            Some(Alignment::Center) => format.set_align(FormatAlign::Center),
            Some(Alignment::Right) => format.set_align(FormatAlign::Right),
            None => format,
        };

        if spec.field_type == FieldType::Time {
            let moment = spec
                .format
                .as_deref()
                .or(self.full_date_format.as_deref())
                .unwrap_or(DEFAULT_FULL_DATE_FORMAT);
            format = format.set_num_format(DateFormat::parse(moment).to_excel());
        }

        format
    }

    /// Write a single cell value with its colors and link
    fn write_cell(
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        cell: &CellValue,
        base: &Format,
    ) -> ExportResult<()> {
        let format = cell_format(base, cell);

        if let Some(link) = &cell.link {
            let url = Url::new(link.href.as_str())
                .set_text(link.title.as_str())
                .set_tip(link.href.as_str());
            let written = worksheet
                .write_url_with_format(row, col, url, &format)
                .map(|_| ());
            if let Err(e) = written {
                // Relative or unsupported hrefs keep the link text only
                warn!(href = %link.href, error = %e, "writing link as text");
                worksheet.write_string_with_format(row, col, &link.title, &format)?;
            }
            return Ok(());
        }

        match &cell.value {
            CellData::Time(dt) => {
                worksheet.write_number_with_format(row, col, excel_serial(dt), &format)?;
            }
            CellData::Number(n) if n.is_finite() => {
                worksheet.write_number_with_format(row, col, *n, &format)?;
            }
            CellData::Number(n) => {
                worksheet.write_string_with_format(row, col, n.to_string(), &format)?;
            }
            CellData::Boolean(b) => {
                worksheet.write_boolean_with_format(row, col, *b, &format)?;
            }
            CellData::Text(s) | CellData::Raw(Value::String(s)) => {
                worksheet.write_string_with_format(row, col, s, &format)?;
            }
            CellData::Raw(Value::Null) => {
                worksheet.write_blank(row, col, &format)?;
            }
            CellData::Raw(other) => {
                worksheet.write_string_with_format(row, col, other.to_string(), &format)?;
            }
        }
        Ok(())
    }
}

/// Column format plus the cell's font color and solid background
fn cell_format(base: &Format, cell: &CellValue) -> Format {
    let mut format = base.clone();
    if let Some(color) = cell.color.as_deref().and_then(xlsx_color) {
        format = format.set_font_color(color);
    }
    if let Some(color) = cell.background.as_deref().and_then(xlsx_color) {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(color);
    }
    format
}

/// Hex color → xlsx color; anything else is dropped
fn xlsx_color(color: &str) -> Option<Color> {
    match parse_hex_color(color) {
        Ok((r, g, b)) => Some(Color::RGB(
            (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b),
        )),
        Err(e) => {
            debug!(color, error = %e, "skipping non-hex color");
            None
        }
    }
}

/// Excel serial date (days since 1899-12-30, fractional)
pub(crate) fn excel_serial(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_millis() as f64 / MILLIS_PER_DAY + EXCEL_UNIX_EPOCH_DAYS
}
