//! Export configuration
//!
//! Every key has a default, so an empty (or absent) config file is valid.
//!
//! ```yaml
//! full_date_format: "YYYY-MM-DD HH:mm:ss"
//! file_timestamp_format: "YYYY-MM-DD HH-mm-ss"
//! acquisition_timeout_secs: 300
//! link_color: "#6E9FFF"
//! default_column_width: 150
//! column_matching: positional
//! ```

use crate::error::ExportResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default system full-date format for time columns without a `time:` unit
pub const DEFAULT_FULL_DATE_FORMAT: &str = "YYYY-MM-DD HH:mm:ss";

/// Default format for timestamps embedded in file names
pub const DEFAULT_FILE_TIMESTAMP_FORMAT: &str = "YYYY-MM-DD HH-mm-ss";

/// Color forced onto every hyperlinked cell
pub const DEFAULT_LINK_COLOR: &str = "#6E9FFF";

/// Column width in pixels when the field config does not set one
pub const DEFAULT_COLUMN_WIDTH: u32 = 150;

/// Five minutes, per panel
pub const DEFAULT_ACQUISITION_TIMEOUT_SECS: u64 = 300;

/// How fields of later tables are matched to existing columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMatching {
    /// Field index within its table is the column key
    #[default]
    Positional,
    /// Fields with the same display name share a column
    ByName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub full_date_format: String,
    pub file_timestamp_format: String,
    pub acquisition_timeout_secs: u64,
    pub link_color: String,
    pub default_column_width: u32,
    pub column_matching: ColumnMatching,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            full_date_format: DEFAULT_FULL_DATE_FORMAT.to_string(),
            file_timestamp_format: DEFAULT_FILE_TIMESTAMP_FORMAT.to_string(),
            acquisition_timeout_secs: DEFAULT_ACQUISITION_TIMEOUT_SECS,
            link_color: DEFAULT_LINK_COLOR.to_string(),
            default_column_width: DEFAULT_COLUMN_WIDTH,
            column_matching: ColumnMatching::Positional,
        }
    }
}

impl ExportConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> ExportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text. Blank input yields the defaults.
    pub fn from_yaml(content: &str) -> ExportResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> ExportResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_secs(self.acquisition_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.full_date_format, "YYYY-MM-DD HH:mm:ss");
        assert_eq!(config.default_column_width, 150);
        assert_eq!(config.acquisition_timeout(), Duration::from_secs(300));
        assert_eq!(config.column_matching, ColumnMatching::Positional);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = ExportConfig::from_yaml("   \n").unwrap();
        assert_eq!(config, ExportConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = ExportConfig::from_yaml(
            "full_date_format: \"DD/MM/YYYY\"\ncolumn_matching: by_name\n",
        )
        .unwrap();
        assert_eq!(config.full_date_format, "DD/MM/YYYY");
        assert_eq!(config.column_matching, ColumnMatching::ByName);
        assert_eq!(config.link_color, DEFAULT_LINK_COLOR);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(ExportConfig::from_yaml("acquisition_timeout_secs: [1, 2]").is_err());
    }
}
