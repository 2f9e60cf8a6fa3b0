//! Export service
//!
//! The automation-facing entry point. Constructed explicitly with its
//! configuration and image renderer, then handed to the CLI or HTTP layer.

use crate::acquire::{wait_for_data, ImageRenderer, PanelDataSource};
use crate::config::ExportConfig;
use crate::dashboard::{Dashboard, Panel};
use crate::error::{ExportError, ExportResult};
use crate::export::{
    encode_csv, encode_zip, export_file_name, ExportArtifact, ExportFormat, SheetItem,
    XlsxEncoder,
};
use crate::format::{format_datetime, FormatterOptions, SheetFormatter};
use crate::types::{NormalizedSheet, ResultTable};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Query results acquired for one panel
#[derive(Debug, Clone)]
pub struct PanelTables<'a> {
    pub panel: &'a Panel,
    pub tables: Vec<ResultTable>,
}

pub struct ExportService {
    config: ExportConfig,
    formatter: SheetFormatter,
    images: Arc<dyn ImageRenderer>,
    running: AtomicBool,
}

impl ExportService {
    pub fn new(config: ExportConfig, images: Arc<dyn ImageRenderer>) -> Self {
        let formatter = SheetFormatter::new(FormatterOptions::from(&config));
        Self {
            config,
            formatter,
            images,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn formatter(&self) -> &SheetFormatter {
        &self.formatter
    }

    /// Begin accepting exports
    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            info!("export service started");
        }
    }

    /// Stop accepting exports. Later calls fail with `InvalidTransition`.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("export service stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> ExportResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ExportError::InvalidTransition(
                "export service is not running".to_string(),
            ))
        }
    }

    /// Wait for the data of each panel, in order. The first failure aborts.
    pub async fn collect<'a>(
        &self,
        panels: &[&'a Panel],
        source: &dyn PanelDataSource,
    ) -> ExportResult<Vec<PanelTables<'a>>> {
        let timeout = self.config.acquisition_timeout();
        let mut collected = Vec::with_capacity(panels.len());

        for &panel in panels {
            let updates = source.subscribe(panel).await?;
            let tables = wait_for_data(&panel.id, updates, timeout).await?;
            debug!(panel = %panel.id, tables = tables.len(), "panel data ready");
            collected.push(PanelTables { panel, tables });
        }
        Ok(collected)
    }

    /// Export the selected panels (empty selection = all) as one file
    pub async fn export(
        &self,
        dashboard: &Dashboard,
        source: &dyn PanelDataSource,
        selection: &[String],
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> ExportResult<ExportArtifact> {
        self.ensure_running()?;
        let panels = dashboard.select(selection)?;
        info!(
            dashboard = %dashboard.title,
            panels = panels.len(),
            %format,
            "starting export"
        );

        let collected = self.collect(&panels, source).await?;

        let bytes = match format {
            ExportFormat::Csv => {
                let tables: Vec<ResultTable> =
                    collected.into_iter().flat_map(|c| c.tables).collect();
                encode_csv(&self.formatter.normalize(&tables))?
            }
            ExportFormat::Zip => {
                let items: Vec<SheetItem> = collected
                    .iter()
                    .map(|c| SheetItem::table(&c.panel.title, self.formatter.normalize(&c.tables)))
                    .collect();
                let timestamp = format_datetime(&now, &self.config.file_timestamp_format);
                encode_zip(&items, &timestamp)?
            }
            ExportFormat::Xlsx => {
                let mut items = Vec::with_capacity(collected.len());
                for c in &collected {
                    if c.panel.kind.is_tabular() {
                        items.push(SheetItem::table(
                            &c.panel.title,
                            self.formatter.normalize(&c.tables),
                        ));
                    } else {
                        let png = self.images.render(c.panel).await?;
                        items.push(SheetItem::image(&c.panel.title, png));
                    }
                }
                XlsxEncoder::new()
                    .with_full_date_format(&self.config.full_date_format)
                    .encode(&items)?
            }
        };

        let file_name = export_file_name(
            &dashboard.title,
            &now,
            &self.config.file_timestamp_format,
            format.extension(),
        );
        info!(file = %file_name, bytes = bytes.len(), "export finished");

        Ok(ExportArtifact {
            file_name,
            format,
            bytes,
        })
    }

    /// Normalized sheet of one panel, or of all panels merged when `panel_id` is `None`
    pub async fn inspect(
        &self,
        dashboard: &Dashboard,
        source: &dyn PanelDataSource,
        panel_id: Option<&str>,
    ) -> ExportResult<NormalizedSheet> {
        self.ensure_running()?;
        let selection: Vec<String> = panel_id.into_iter().map(str::to_string).collect();
        let panels = dashboard.select(&selection)?;
        let tables: Vec<ResultTable> = self
            .collect(&panels, source)
            .await?
            .into_iter()
            .flat_map(|c| c.tables)
            .collect();
        Ok(self.formatter.normalize(&tables))
    }
}
