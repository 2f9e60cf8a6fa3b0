use std::time::Duration;
use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out after {}s waiting for data of panel '{panel}'", timeout.as_secs())]
    AcquisitionTimeout { panel: String, timeout: Duration },

    #[error("Query for panel '{panel}' failed: {message}")]
    Acquisition { panel: String, message: String },

    #[error("Failed to fetch image for panel '{panel}': {message}")]
    ImageFetch { panel: String, message: String },

    #[error("Invalid color '{0}': expected #RGB or #RRGGBB")]
    ColorParse(String),

    #[error("Unknown panel: {0}")]
    UnknownPanel(String),

    #[error("Invalid export state transition: {0}")]
    InvalidTransition(String),
}

impl ExportError {
    /// Whether the error is contained per cell instead of aborting the export
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExportError::ColorParse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_reports_seconds() {
        let err = ExportError::AcquisitionTimeout {
            panel: "cpu".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 300s waiting for data of panel 'cpu'"
        );
    }

    #[test]
    fn test_only_color_errors_are_recoverable() {
        assert!(ExportError::ColorParse("#zz".to_string()).is_recoverable());
        assert!(!ExportError::Acquisition {
            panel: "a".to_string(),
            message: "boom".to_string(),
        }
        .is_recoverable());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ExportError = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
