use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

//==============================================================================
// Result Table Types
//==============================================================================

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Time,
    Number,
    Boolean,
    #[default]
    String,
    /// Any other declared type (enum, frame, geo, ...), treated like a string
    #[serde(other)]
    Other,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Time => "time",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::String => "string",
            FieldType::Other => "other",
        }
    }
}

/// Alignment as written in field config (`auto` included)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigAlign {
    #[default]
    Auto,
    Left,
    Right,
    Center,
}

impl ConfigAlign {
    /// `auto` collapses to no explicit alignment
    pub fn resolve(self) -> Option<Alignment> {
        match self {
            ConfigAlign::Auto => None,
            ConfigAlign::Left => Some(Alignment::Left),
            ConfigAlign::Right => Some(Alignment::Right),
            ConfigAlign::Center => Some(Alignment::Center),
        }
    }
}

/// Resolved horizontal alignment of a sheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Cell coloring mode from `custom.cell_options.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellDisplayMode {
    #[default]
    Auto,
    ColorText,
    ColorBackground,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellOptions {
    #[serde(rename = "type", default)]
    pub mode: CellDisplayMode,
}

/// Custom presentation hints of a field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomConfig {
    pub hidden: bool,
    pub width: Option<u32>,
    pub align: ConfigAlign,
    pub cell_options: CellOptions,
}

/// Color step: values at or above `value` take `color`. `None` is the base step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default)]
    pub value: Option<f64>,
    pub color: String,
}

/// Link template; `${__value.raw}`, `${__value.text}` and `${__row}` are interpolated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTemplate {
    pub title: String,
    pub url: String,
}

/// Field configuration block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub display_name: Option<String>,
    pub unit: Option<String>,
    pub decimals: Option<u32>,
    pub thresholds: Vec<Threshold>,
    pub links: Vec<LinkTemplate>,
    pub custom: CustomConfig,
}

impl FieldConfig {
    /// Custom time format carried by a `time:<format>` unit
    pub fn time_format(&self) -> Option<&str> {
        self.unit
            .as_deref()
            .and_then(|unit| unit.strip_prefix("time:"))
            .filter(|format| !format.is_empty())
    }
}

/// Human-readable rendering of a raw value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayValue {
    pub text: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub color: Option<String>,
}

impl DisplayValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Prefix, text and suffix joined
    pub fn to_display_string(&self) -> String {
        format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            self.text,
            self.suffix.as_deref().unwrap_or("")
        )
    }
}

/// Resolved hyperlink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub href: String,
}

/// Display and link capabilities of a field.
///
/// Both methods are optional: the default `display` yields nothing (raw values
/// are kept) and the default `links` yields no links.
pub trait FieldPresenter: Send + Sync {
    fn display(&self, _value: &Value) -> Option<DisplayValue> {
        None
    }

    fn links(&self, _row: usize) -> Vec<Link> {
        Vec::new()
    }
}

/// A named, typed column of a result table
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub config: FieldConfig,
    pub values: Vec<Value>,
    pub presenter: Option<Arc<dyn FieldPresenter>>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            field_type,
            config: FieldConfig::default(),
            values,
            presenter: None,
        }
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn FieldPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Configured display name, falling back to the field name
    pub fn display_name(&self) -> &str {
        self.config.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("config", &self.config)
            .field("values", &self.values)
            .field("presenter", &self.presenter.is_some())
            .finish()
    }
}

/// A set of equal-length fields
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    pub name: Option<String>,
    pub fields: Vec<Field>,
}

impl ResultTable {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { name: None, fields }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Length of the first field; all fields are assumed to match
    pub fn row_count(&self) -> usize {
        self.fields.first().map_or(0, |f| f.len())
    }

    /// Validate all fields have the same length
    pub fn validate_lengths(&self) -> Result<(), String> {
        let row_count = self.row_count();
        for field in &self.fields {
            if field.len() != row_count {
                return Err(format!(
                    "Field '{}' has {} rows, expected {} rows",
                    field.name,
                    field.len(),
                    row_count
                ));
            }
        }
        Ok(())
    }
}

//==============================================================================
// Normalized Sheet Types
//==============================================================================

/// Column metadata captured from the first field seen at a position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub field_type: FieldType,
    pub hidden: bool,
    pub align: Option<Alignment>,
    pub width: u32,
    /// Moment-style format, only set for time columns
    pub format: Option<String>,
}

/// Resolved value of a cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CellData {
    Time(DateTime<Utc>),
    Number(f64),
    Boolean(bool),
    Text(String),
    /// Uncoerced raw value
    Raw(Value),
}

impl CellData {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellData::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellData::Text(s) => Some(s),
            CellData::Raw(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellValue {
    pub value: CellData,
    pub color: Option<String>,
    pub background: Option<String>,
    pub link: Option<Link>,
}

impl CellValue {
    pub fn plain(value: CellData) -> Self {
        Self {
            value,
            color: None,
            background: None,
            link: None,
        }
    }
}

/// A column of the normalized sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetColumn {
    /// Stringified 0-based position
    pub key: String,
    pub spec: ColumnSpec,
    pub cells: Vec<CellValue>,
}

/// Ordered column-keyed cell grid handed to the encoders
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizedSheet {
    pub columns: Vec<SheetColumn>,
}

impl NormalizedSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SheetColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Longest column; shorter columns are padded with empty cells by encoders
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.cells.len()).max().unwrap_or(0)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &SheetColumn> {
        self.columns.iter().filter(|c| !c.spec.hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_unknown_is_other() {
        let t: FieldType = serde_json::from_value(json!("geo")).unwrap();
        assert_eq!(t, FieldType::Other);
        let t: FieldType = serde_json::from_value(json!("time")).unwrap();
        assert_eq!(t, FieldType::Time);
    }

    #[test]
    fn test_config_align_auto_resolves_to_none() {
        assert_eq!(ConfigAlign::Auto.resolve(), None);
        assert_eq!(ConfigAlign::Center.resolve(), Some(Alignment::Center));
    }

    #[test]
    fn test_time_format_from_unit() {
        let config = FieldConfig {
            unit: Some("time:YYYY-MM-DD".to_string()),
            ..Default::default()
        };
        assert_eq!(config.time_format(), Some("YYYY-MM-DD"));

        let config = FieldConfig {
            unit: Some("dateTimeAsIso".to_string()),
            ..Default::default()
        };
        assert_eq!(config.time_format(), None);

        let config = FieldConfig {
            unit: Some("time:".to_string()),
            ..Default::default()
        };
        assert_eq!(config.time_format(), None);
    }

    #[test]
    fn test_cell_options_parse() {
        let custom: CustomConfig = serde_json::from_value(json!({
            "hidden": true,
            "align": "right",
            "cell_options": { "type": "color-background" }
        }))
        .unwrap();
        assert!(custom.hidden);
        assert_eq!(custom.align, ConfigAlign::Right);
        assert_eq!(custom.cell_options.mode, CellDisplayMode::ColorBackground);
        assert_eq!(custom.width, None);
    }

    #[test]
    fn test_display_name_fallback() {
        let field = Field::new("value", FieldType::Number, vec![]);
        assert_eq!(field.display_name(), "value");

        let field = field.with_config(FieldConfig {
            display_name: Some("CPU".to_string()),
            ..Default::default()
        });
        assert_eq!(field.display_name(), "CPU");
    }

    #[test]
    fn test_table_row_count_and_validation() {
        let table = ResultTable::new(vec![
            Field::new("a", FieldType::String, vec![json!("x"), json!("y")]),
            Field::new("b", FieldType::Number, vec![json!(1)]),
        ]);
        assert_eq!(table.row_count(), 2);
        assert!(table.validate_lengths().is_err());
        assert_eq!(ResultTable::default().row_count(), 0);
    }

    #[test]
    fn test_display_value_string() {
        let mut dv = DisplayValue::new("42");
        dv.suffix = Some("%".to_string());
        assert_eq!(dv.to_display_string(), "42%");
    }
}
