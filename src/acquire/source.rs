//! Panel query results

use crate::dashboard::Panel;
use crate::error::{ExportError, ExportResult};
use crate::types::ResultTable;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Lifecycle of a panel query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingState {
    NotStarted,
    Loading,
    Streaming,
    Done,
    Error,
}

impl LoadingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadingState::Done | LoadingState::Error)
    }
}

/// One update from a panel's query stream
#[derive(Debug, Clone)]
pub struct PanelData {
    pub state: LoadingState,
    pub tables: Vec<ResultTable>,
    pub error: Option<String>,
}

impl PanelData {
    pub fn loading() -> Self {
        Self {
            state: LoadingState::Loading,
            tables: Vec::new(),
            error: None,
        }
    }

    pub fn done(tables: Vec<ResultTable>) -> Self {
        Self {
            state: LoadingState::Done,
            tables,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: LoadingState::Error,
            tables: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Source of panel query results
#[async_trait]
pub trait PanelDataSource: Send + Sync {
    /// Subscribe to the query results of `panel`.
    ///
    /// Dropping the receiver cancels the subscription.
    async fn subscribe(&self, panel: &Panel) -> ExportResult<mpsc::Receiver<PanelData>>;
}

/// Wait until the stream reaches `Done` or `Error`, at most `timeout`.
///
/// On timeout the receiver is dropped, which cancels the subscription.
pub async fn wait_for_data(
    panel_id: &str,
    mut updates: mpsc::Receiver<PanelData>,
    timeout: Duration,
) -> ExportResult<Vec<ResultTable>> {
    let wait = async move {
        while let Some(update) = updates.recv().await {
            match update.state {
                LoadingState::Done => return Ok(update.tables),
                LoadingState::Error => {
                    return Err(ExportError::Acquisition {
                        panel: panel_id.to_string(),
                        message: update
                            .error
                            .unwrap_or_else(|| "unknown query error".to_string()),
                    })
                }
                state => debug!(panel = panel_id, ?state, "panel data not ready"),
            }
        }
        Err(ExportError::Acquisition {
            panel: panel_id.to_string(),
            message: "data stream closed before completion".to_string(),
        })
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => {
            warn!(panel = panel_id, ?timeout, "timed out waiting for panel data");
            Err(ExportError::AcquisitionTimeout {
                panel: panel_id.to_string(),
                timeout,
            })
        }
    }
}

/// Serves query results captured in a dashboard snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    data: HashMap<String, Vec<ResultTable>>,
}

impl SnapshotSource {
    pub fn new(data: HashMap<String, Vec<ResultTable>>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl PanelDataSource for SnapshotSource {
    async fn subscribe(&self, panel: &Panel) -> ExportResult<mpsc::Receiver<PanelData>> {
        let tables = self.data.get(&panel.id).cloned().unwrap_or_default();
        let (tx, rx) = mpsc::channel(2);
        // Capacity covers both updates, so sends cannot block or fail
        let _ = tx.send(PanelData::loading()).await;
        let _ = tx.send(PanelData::done(tables)).await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::PanelKind;
    use crate::types::{Field, FieldType};
    use serde_json::json;

    fn panel(id: &str) -> Panel {
        Panel {
            id: id.to_string(),
            title: id.to_uppercase(),
            kind: PanelKind::Table,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_done_returns_tables() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(PanelData::loading()).await.unwrap();
        tx.send(PanelData::done(vec![ResultTable::default()])).await.unwrap();
        let tables = wait_for_data("p", rx, Duration::from_secs(1)).await.unwrap();
        assert_eq!(tables.len(), 1);
    }

    #[tokio::test]
    async fn test_error_payload_forwarded() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(PanelData::error("datasource down")).await.unwrap();
        let err = wait_for_data("p", rx, Duration::from_secs(1)).await.unwrap_err();
        match err {
            ExportError::Acquisition { panel, message } => {
                assert_eq!(panel, "p");
                assert_eq!(message, "datasource down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_cancels_subscription() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(PanelData::loading()).await.unwrap();

        let err = wait_for_data("slow", rx, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::AcquisitionTimeout { ref panel, .. } if panel == "slow"));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_closed_stream_is_error() {
        let (tx, rx) = mpsc::channel::<PanelData>(1);
        drop(tx);
        let err = wait_for_data("p", rx, Duration::from_secs(1)).await.unwrap_err();
        assert!(err.to_string().contains("closed before completion"));
    }

    #[tokio::test]
    async fn test_snapshot_source() {
        let mut data = HashMap::new();
        data.insert(
            "a".to_string(),
            vec![ResultTable::new(vec![Field::new(
                "v",
                FieldType::Number,
                vec![json!(1)],
            )])],
        );
        let source = SnapshotSource::new(data);

        let rx = source.subscribe(&panel("a")).await.unwrap();
        let tables = wait_for_data("a", rx, Duration::from_secs(1)).await.unwrap();
        assert_eq!(tables[0].row_count(), 1);

        let rx = source.subscribe(&panel("missing")).await.unwrap();
        let tables = wait_for_data("missing", rx, Duration::from_secs(1)).await.unwrap();
        assert!(tables.is_empty());
    }
}
