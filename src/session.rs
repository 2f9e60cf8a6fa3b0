//! Export dialog state
//!
//! ```text
//! Idle ──begin──▶ Exporting ──complete──▶ Idle
//!                     │
//!                    fail
//!                     ▼
//!                  Failed ──begin (retry)──▶ Exporting
//! ```

use crate::error::{ExportError, ExportResult};
use crate::export::ExportFormat;
use serde::Serialize;
use std::future::Future;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExportState {
    Idle,
    Exporting { format: ExportFormat },
    Failed { message: String },
}

impl ExportState {
    fn name(&self) -> &'static str {
        match self {
            ExportState::Idle => "idle",
            ExportState::Exporting { .. } => "exporting",
            ExportState::Failed { .. } => "failed",
        }
    }
}

/// Panel selection plus the state of the export in progress
#[derive(Debug, Clone)]
pub struct ExportSession {
    state: ExportState,
    selection: Vec<String>,
}

impl Default for ExportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportSession {
    pub fn new() -> Self {
        Self {
            state: ExportState::Idle,
            selection: Vec::new(),
        }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Replace the panel selection. Not allowed while exporting.
    pub fn select(&mut self, panel_ids: Vec<String>) -> ExportResult<()> {
        if let ExportState::Exporting { .. } = self.state {
            return Err(ExportError::InvalidTransition(
                "cannot change selection while exporting".to_string(),
            ));
        }
        self.selection = panel_ids;
        Ok(())
    }

    pub fn begin(&mut self, format: ExportFormat) -> ExportResult<()> {
        match &self.state {
            ExportState::Idle | ExportState::Failed { .. } => {
                info!(%format, "export started");
                self.state = ExportState::Exporting { format };
                Ok(())
            }
            ExportState::Exporting { format: current } => Err(ExportError::InvalidTransition(
                format!("export to {} already in progress", current),
            )),
        }
    }

    pub fn complete(&mut self) -> ExportResult<()> {
        self.expect_exporting("complete")?;
        self.state = ExportState::Idle;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> ExportResult<()> {
        self.expect_exporting("fail")?;
        let message = message.into();
        warn!(%message, "export failed");
        self.state = ExportState::Failed { message };
        Ok(())
    }

    /// Dismiss a failure
    pub fn reset(&mut self) -> ExportResult<()> {
        match self.state {
            ExportState::Failed { .. } | ExportState::Idle => {
                self.state = ExportState::Idle;
                Ok(())
            }
            ExportState::Exporting { .. } => Err(ExportError::InvalidTransition(
                "cannot reset while exporting".to_string(),
            )),
        }
    }

    /// Drive `export` through the state machine: `begin`, then `complete` or `fail`
    pub async fn run<T, F>(&mut self, format: ExportFormat, export: F) -> ExportResult<T>
    where
        F: Future<Output = ExportResult<T>>,
    {
        self.begin(format)?;
        match export.await {
            Ok(value) => {
                self.complete()?;
                Ok(value)
            }
            Err(e) => {
                self.fail(e.to_string())?;
                Err(e)
            }
        }
    }

    fn expect_exporting(&self, action: &str) -> ExportResult<()> {
        match self.state {
            ExportState::Exporting { .. } => Ok(()),
            ref other => Err(ExportError::InvalidTransition(format!(
                "cannot {} from {}",
                action,
                other.name()
            ))),
        }
    }
}
