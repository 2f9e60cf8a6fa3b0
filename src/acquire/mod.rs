//! Panel data acquisition
//!
//! Query results arrive as a stream of [`PanelData`] updates; exports wait for
//! the stream to finish (bounded by a timeout). Non-tabular panels are
//! rendered to PNG by an [`ImageRenderer`].

mod image;
mod source;

pub use image::{FileImageRenderer, HttpImageRenderer, ImageRenderer};
pub use source::{wait_for_data, LoadingState, PanelData, PanelDataSource, SnapshotSource};
