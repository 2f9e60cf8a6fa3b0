//! Rendered images of non-tabular panels

use crate::dashboard::Panel;
use crate::error::{ExportError, ExportResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Produces a PNG rendering of a panel
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, panel: &Panel) -> ExportResult<Vec<u8>>;
}

/// Fetches the panel's `image_url` from a render service
#[derive(Debug, Clone)]
pub struct HttpImageRenderer {
    client: reqwest::Client,
}

impl HttpImageRenderer {
    pub fn new(timeout: Duration) -> ExportResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageRenderer for HttpImageRenderer {
    async fn render(&self, panel: &Panel) -> ExportResult<Vec<u8>> {
        let fetch_error = |message: String| ExportError::ImageFetch {
            panel: panel.id.clone(),
            message,
        };

        let url = panel
            .image_url
            .as_deref()
            .ok_or_else(|| fetch_error("panel has no image_url".to_string()))?;

        debug!(panel = %panel.id, url, "fetching panel image");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("render service returned {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// Reads pre-rendered `<dir>/<panel id>.png` files
#[derive(Debug, Clone)]
pub struct FileImageRenderer {
    dir: PathBuf,
}

impl FileImageRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageRenderer for FileImageRenderer {
    async fn render(&self, panel: &Panel) -> ExportResult<Vec<u8>> {
        let path = self.dir.join(format!("{}.png", panel.id));
        debug!(panel = %panel.id, path = %path.display(), "reading panel image");
        tokio::fs::read(&path)
            .await
            .map_err(|e| ExportError::ImageFetch {
                panel: panel.id.clone(),
                message: format!("{}: {}", path.display(), e),
            })
    }
}
