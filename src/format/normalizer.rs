//! Result tables → normalized sheet
//!
//! Flattens a sequence of typed result tables into one column-keyed grid of
//! resolved cells. Columns are keyed by field position (or display name, when
//! configured), their metadata is captured from the first field seen at that
//! key, and cells are appended table by table, row by row.

use crate::config::{ColumnMatching, ExportConfig};
use crate::format::contrast::compute_contrast_color;
use crate::types::{
    CellData, CellDisplayMode, CellValue, ColumnSpec, DisplayValue, Field, FieldType,
    NormalizedSheet, ResultTable, SheetColumn,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Options controlling column metadata and link styling
#[derive(Debug, Clone, PartialEq)]
pub struct FormatterOptions {
    pub full_date_format: String,
    pub link_color: String,
    pub default_column_width: u32,
    pub column_matching: ColumnMatching,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for FormatterOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            full_date_format: config.full_date_format.clone(),
            link_color: config.link_color.clone(),
            default_column_width: config.default_column_width,
            column_matching: config.column_matching,
        }
    }
}

/// Builds normalized sheets from result tables
#[derive(Debug, Clone, Default)]
pub struct SheetFormatter {
    options: FormatterOptions,
}

impl SheetFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormatterOptions {
        &self.options
    }

    /// Normalize `tables` into a fresh sheet. Pure; never fails.
    pub fn normalize(&self, tables: &[ResultTable]) -> NormalizedSheet {
        let mut sheet = NormalizedSheet::new();
        // display name -> column index, only used when matching by name
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for (table_idx, table) in tables.iter().enumerate() {
            if table.fields.is_empty() {
                debug!(table = table_idx, "skipping table without fields");
                continue;
            }

            let row_count = table.row_count();

            for (field_idx, field) in table.fields.iter().enumerate() {
                let column_idx = match self.options.column_matching {
                    ColumnMatching::Positional => field_idx,
                    ColumnMatching::ByName => {
                        let next = sheet.columns.len();
                        *by_name
                            .entry(field.display_name().to_string())
                            .or_insert(next)
                    }
                };

                if column_idx >= sheet.columns.len() {
                    sheet.columns.push(SheetColumn {
                        key: column_idx.to_string(),
                        spec: self.column_spec(field),
                        cells: Vec::with_capacity(row_count),
                    });
                }

                let column = &mut sheet.columns[column_idx];
                for row in 0..row_count {
                    column.cells.push(self.resolve_cell(field, row));
                }
            }
        }

        sheet
    }

    /// Column metadata from the first field seen at a key
    fn column_spec(&self, field: &Field) -> ColumnSpec {
        let custom = &field.config.custom;
        let format = match field.field_type {
            FieldType::Time => Some(
                field
                    .config
                    .time_format()
                    .unwrap_or(&self.options.full_date_format)
                    .to_string(),
            ),
            _ => None,
        };

        ColumnSpec {
            name: field.display_name().to_string(),
            field_type: field.field_type,
            hidden: custom.hidden,
            align: custom.align.resolve(),
            width: custom.width.unwrap_or(self.options.default_column_width),
            format,
        }
    }

    fn resolve_cell(&self, field: &Field, row: usize) -> CellValue {
        let raw = field.values.get(row).cloned().unwrap_or(Value::Null);
        let display = field
            .presenter
            .as_ref()
            .and_then(|presenter| presenter.display(&raw));

        let value = match field.field_type {
            FieldType::Time => coerce_time(&raw).map_or(CellData::Raw(raw), CellData::Time),
            FieldType::Number => CellData::Number(coerce_number(&raw)),
            FieldType::Boolean => CellData::Boolean(coerce_boolean(&raw)),
            FieldType::String | FieldType::Other => match &display {
                Some(dv) => CellData::Text(dv.to_display_string()),
                None => match raw {
                    Value::String(s) => CellData::Text(s),
                    other => CellData::Raw(other),
                },
            },
        };

        let mut cell = CellValue::plain(value);
        self.apply_cell_colors(field, display.as_ref(), &mut cell);

        if let Some(presenter) = &field.presenter {
            if let Some(link) = presenter.links(row).into_iter().next() {
                cell.link = Some(link);
                cell.color = Some(self.options.link_color.clone());
            }
        }

        cell
    }

    fn apply_cell_colors(&self, field: &Field, display: Option<&DisplayValue>, cell: &mut CellValue) {
        let color = display.and_then(|dv| dv.color.clone());
        match field.config.custom.cell_options.mode {
            CellDisplayMode::ColorText => {
                cell.color = color;
            }
            CellDisplayMode::ColorBackground => {
                cell.color = match compute_contrast_color(color.as_deref()) {
                    Ok(contrast) => contrast.map(str::to_string),
                    Err(e) => {
                        warn!(field = %field.name, error = %e, "no contrast color for cell");
                        None
                    }
                };
                cell.background = color;
            }
            CellDisplayMode::Auto | CellDisplayMode::Other => {}
        }
    }
}

/// Normalize with default options
pub fn normalize(tables: &[ResultTable]) -> NormalizedSheet {
    SheetFormatter::default().normalize(tables)
}

//==============================================================================
// Value coercion
//==============================================================================

/// Epoch milliseconds, numeric strings, RFC 3339, or `YYYY-MM-DD[ HH:mm:ss]`
pub fn coerce_time(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                return DateTime::from_timestamp_millis(ms);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
                    return Some(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

/// Numeric coercion: null and blank are 0, booleans are 1/0, junk is NaN
pub fn coerce_number(raw: &Value) -> f64 {
    match raw {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Truthiness: null, false, 0, NaN and "" are false
pub fn coerce_boolean(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CellOptions, ConfigAlign, CustomConfig, FieldConfig, FieldPresenter, Link,
    };
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    struct Colored(&'static str);

    impl FieldPresenter for Colored {
        fn display(&self, value: &Value) -> Option<DisplayValue> {
            Some(DisplayValue::new(value.to_string()).with_color(self.0))
        }
    }

    struct Linked;

    impl FieldPresenter for Linked {
        fn display(&self, value: &Value) -> Option<DisplayValue> {
            Some(DisplayValue::new(value.to_string()).with_color("#000000"))
        }

        fn links(&self, row: usize) -> Vec<Link> {
            vec![
                Link {
                    title: format!("row {row}"),
                    href: format!("https://example.com/{row}"),
                },
                Link {
                    title: "second".to_string(),
                    href: "https://example.com/ignored".to_string(),
                },
            ]
        }
    }

    fn mode_config(mode: CellDisplayMode) -> FieldConfig {
        FieldConfig {
            custom: CustomConfig {
                cell_options: CellOptions { mode },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_two_field_table() {
        let table = ResultTable::new(vec![
            Field::new("name", FieldType::String, vec![json!("a"), json!("b")]),
            Field::new("value", FieldType::Number, vec![json!(1), json!(2)]),
        ]);
        let sheet = normalize(&[table]);

        assert_eq!(sheet.keys(), vec!["0", "1"]);
        let names: Vec<_> = sheet.get("0").unwrap().cells.iter().map(|c| c.value.clone()).collect();
        assert_eq!(
            names,
            vec![CellData::Text("a".to_string()), CellData::Text("b".to_string())]
        );
        let values: Vec<_> = sheet.get("1").unwrap().cells.iter().map(|c| c.value.as_number()).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_empty_table_is_skipped() {
        let tables = vec![
            ResultTable::new(vec![Field::new("a", FieldType::Number, vec![json!(1)])]),
            ResultTable::new(vec![]),
            ResultTable::new(vec![Field::new("b", FieldType::Number, vec![json!(2)])]),
        ];
        let sheet = normalize(&tables);
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.get("0").unwrap().cells.len(), 2);
        assert_eq!(sheet.get("0").unwrap().spec.name, "a");
    }

    #[test]
    fn test_time_format_from_unit_and_default() {
        let custom = Field::new("t", FieldType::Time, vec![json!(0)]).with_config(FieldConfig {
            unit: Some("time:YYYY-MM-DD".to_string()),
            ..Default::default()
        });
        let plain = Field::new("t2", FieldType::Time, vec![json!(0)]);
        let sheet = normalize(&[ResultTable::new(vec![custom, plain])]);

        assert_eq!(sheet.get("0").unwrap().spec.format.as_deref(), Some("YYYY-MM-DD"));
        assert_eq!(
            sheet.get("1").unwrap().spec.format.as_deref(),
            Some("YYYY-MM-DD HH:mm:ss")
        );
        assert_eq!(
            sheet.get("0").unwrap().cells[0].value,
            CellData::Time(Utc.timestamp_millis_opt(0).unwrap())
        );
    }

    #[test]
    fn test_non_time_columns_have_no_format() {
        let field = Field::new("n", FieldType::Number, vec![json!(1)]).with_config(FieldConfig {
            unit: Some("time:YYYY".to_string()),
            ..Default::default()
        });
        let sheet = normalize(&[ResultTable::new(vec![field])]);
        assert_eq!(sheet.get("0").unwrap().spec.format, None);
    }

    #[test]
    fn test_column_spec_defaults_and_auto_align() {
        let field = Field::new("x", FieldType::String, vec![json!("v")]).with_config(FieldConfig {
            custom: CustomConfig {
                align: ConfigAlign::Auto,
                ..Default::default()
            },
            ..Default::default()
        });
        let spec = &normalize(&[ResultTable::new(vec![field])]).columns[0].spec;
        assert_eq!(spec.align, None);
        assert_eq!(spec.width, 150);
        assert!(!spec.hidden);
    }

    #[test]
    fn test_first_seen_metadata_wins() {
        let first = Field::new("first", FieldType::Time, vec![json!(0)]).with_config(FieldConfig {
            unit: Some("time:YYYY".to_string()),
            ..Default::default()
        });
        let second = Field::new("second", FieldType::Time, vec![json!(0)]).with_config(FieldConfig {
            unit: Some("time:HH:mm".to_string()),
            ..Default::default()
        });
        let sheet = normalize(&[ResultTable::new(vec![first]), ResultTable::new(vec![second])]);
        let column = sheet.get("0").unwrap();
        assert_eq!(column.spec.name, "first");
        assert_eq!(column.spec.format.as_deref(), Some("YYYY"));
        assert_eq!(column.cells.len(), 2);
    }

    #[test]
    fn test_color_text_mode() {
        let field = Field::new("v", FieldType::Number, vec![json!(5)])
            .with_config(mode_config(CellDisplayMode::ColorText))
            .with_presenter(Arc::new(Colored("#73BF69")));
        let cell = &normalize(&[ResultTable::new(vec![field])]).columns[0].cells[0];
        assert_eq!(cell.color.as_deref(), Some("#73BF69"));
        assert_eq!(cell.background, None);
        assert_eq!(cell.value, CellData::Number(5.0));
    }

    #[test]
    fn test_color_background_mode_computes_contrast() {
        let field = Field::new("v", FieldType::Number, vec![json!(5)])
            .with_config(mode_config(CellDisplayMode::ColorBackground))
            .with_presenter(Arc::new(Colored("#000")));
        let cell = &normalize(&[ResultTable::new(vec![field])]).columns[0].cells[0];
        assert_eq!(cell.background.as_deref(), Some("#000"));
        assert_eq!(cell.color.as_deref(), Some("#ffffff"));
    }

    #[test]
    fn test_malformed_background_keeps_export_going() {
        let field = Field::new("v", FieldType::Number, vec![json!(5), json!(6)])
            .with_config(mode_config(CellDisplayMode::ColorBackground))
            .with_presenter(Arc::new(Colored("green")));
        let sheet = normalize(&[ResultTable::new(vec![field])]);
        let cells = &sheet.columns[0].cells;
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].background.as_deref(), Some("green"));
        assert_eq!(cells[0].color, None);
    }

    #[test]
    fn test_link_color_wins_over_contrast() {
        let field = Field::new("v", FieldType::String, vec![json!("x")])
            .with_config(mode_config(CellDisplayMode::ColorBackground))
            .with_presenter(Arc::new(Linked));
        let cell = &normalize(&[ResultTable::new(vec![field])]).columns[0].cells[0];
        assert_eq!(cell.color.as_deref(), Some("#6E9FFF"));
        assert_eq!(cell.background.as_deref(), Some("#000000"));
        let link = cell.link.as_ref().unwrap();
        assert_eq!(link.title, "row 0");
        assert_eq!(link.href, "https://example.com/0");
    }

    #[test]
    fn test_no_mode_means_no_color() {
        let field = Field::new("v", FieldType::Number, vec![json!(5)])
            .with_presenter(Arc::new(Colored("#ff0000")));
        let cell = &normalize(&[ResultTable::new(vec![field])]).columns[0].cells[0];
        assert_eq!(cell.color, None);
        assert_eq!(cell.background, None);
    }

    #[test]
    fn test_string_uses_display_text() {
        let field = Field::new("s", FieldType::String, vec![json!(3)])
            .with_presenter(Arc::new(Colored("#fff")));
        let cell = &normalize(&[ResultTable::new(vec![field])]).columns[0].cells[0];
        assert_eq!(cell.value, CellData::Text("3".to_string()));
    }

    #[test]
    fn test_other_type_keeps_raw() {
        let field = Field::new("geo", FieldType::Other, vec![json!({"lat": 1})]);
        let cell = &normalize(&[ResultTable::new(vec![field])]).columns[0].cells[0];
        assert_eq!(cell.value, CellData::Raw(json!({"lat": 1})));
    }

    #[test]
    fn test_by_name_matching() {
        let options = FormatterOptions {
            column_matching: ColumnMatching::ByName,
            ..Default::default()
        };
        let tables = vec![
            ResultTable::new(vec![
                Field::new("a", FieldType::Number, vec![json!(1)]),
                Field::new("b", FieldType::Number, vec![json!(2)]),
            ]),
            ResultTable::new(vec![
                Field::new("b", FieldType::Number, vec![json!(3)]),
                Field::new("c", FieldType::Number, vec![json!(4)]),
            ]),
        ];
        let sheet = SheetFormatter::new(options).normalize(&tables);
        assert_eq!(sheet.keys(), vec!["0", "1", "2"]);
        assert_eq!(sheet.get("1").unwrap().cells.len(), 2);
        assert_eq!(sheet.get("2").unwrap().spec.name, "c");
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(null)), 0.0);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!(" 2.5 ")), 2.5);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert!(coerce_number(&json!("abc")).is_nan());
        assert!(coerce_number(&json!([1])).is_nan());
    }

    #[test]
    fn test_coerce_boolean() {
        assert!(!coerce_boolean(&json!(null)));
        assert!(!coerce_boolean(&json!(0)));
        assert!(!coerce_boolean(&json!("")));
        assert!(coerce_boolean(&json!("false")));
        assert!(coerce_boolean(&json!(2)));
        assert!(coerce_boolean(&json!({})));
    }

    #[test]
    fn test_coerce_time() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(coerce_time(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(coerce_time(&json!("2024-01-02T03:04:05Z")), Some(expected));
        assert_eq!(coerce_time(&json!("2024-01-02 03:04:05")), Some(expected));
        assert_eq!(
            coerce_time(&json!("2024-01-02")),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(coerce_time(&json!("yesterday")), None);
        assert_eq!(coerce_time(&json!(null)), None);
    }

    #[test]
    fn test_unparseable_time_stays_raw() {
        let field = Field::new("t", FieldType::Time, vec![json!("soon")]);
        let cell = &normalize(&[ResultTable::new(vec![field])]).columns[0].cells[0];
        assert_eq!(cell.value, CellData::Raw(json!("soon")));
    }
}
