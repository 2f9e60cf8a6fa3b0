//! Tabular export formatting
//!
//! - `normalizer`: result tables → normalized sheet
//! - `contrast`: readable foreground for colored backgrounds
//! - `date_format`: moment-style date formats, rendered or translated for Excel

pub mod contrast;
pub mod date_format;
mod normalizer;

pub use contrast::compute_contrast_color;
pub use date_format::{format_datetime, DateFormat};
pub use normalizer::{
    coerce_boolean, coerce_number, coerce_time, normalize, FormatterOptions, SheetFormatter,
};
