//! Dashboard model and snapshot loading
//!
//! A snapshot file describes a dashboard and the query results of its panels:
//!
//! ```yaml
//! title: Service Overview
//! panels:
//!   - id: "1"
//!     title: Requests
//!     type: table
//!     tables:
//!       - name: A
//!         fields:
//!           - name: time
//!             type: time
//!             values: [1704067200000, 1704067260000]
//!           - name: status
//!             type: number
//!             values: [200, 500]
//!             config:
//!               thresholds: [{ color: "#73BF69" }, { value: 500, color: "#F2495C" }]
//!               custom: { cell_options: { type: color-background } }
//!   - id: "2"
//!     title: Latency
//!     type: timeseries
//!     image_url: http://render.local/d/abc?panelId=2
//! ```
//!
//! JSON snapshots parse the same way.

use crate::error::{ExportError, ExportResult};
use crate::presenter::ConfiguredPresenter;
use crate::types::{Field, FieldConfig, FieldType, ResultTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Visualization kind of a panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PanelKind {
    Table,
    /// Any non-tabular visualization (graph, stat, gauge, ...)
    Visual(String),
}

impl PanelKind {
    pub fn is_tabular(&self) -> bool {
        matches!(self, PanelKind::Table)
    }
}

impl From<String> for PanelKind {
    fn from(kind: String) -> Self {
        if kind.eq_ignore_ascii_case("table") {
            PanelKind::Table
        } else {
            PanelKind::Visual(kind)
        }
    }
}

impl From<PanelKind> for String {
    fn from(kind: PanelKind) -> Self {
        match kind {
            PanelKind::Table => "table".to_string(),
            PanelKind::Visual(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: PanelKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub title: String,
    pub panels: Vec<Panel>,
}

impl Dashboard {
    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    /// Panels to export, in selection order. An empty selection means all
    /// panels in dashboard order. Repeated ids are exported once.
    pub fn select(&self, selection: &[String]) -> ExportResult<Vec<&Panel>> {
        if selection.is_empty() {
            return Ok(self.panels.iter().collect());
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for id in selection {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let panel = self
                .panel(id)
                .ok_or_else(|| ExportError::UnknownPanel(id.clone()))?;
            selected.push(panel);
        }
        Ok(selected)
    }
}

//==============================================================================
// Snapshot file
//==============================================================================

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    title: String,
    #[serde(default)]
    panels: Vec<PanelFile>,
}

#[derive(Debug, Deserialize)]
struct PanelFile {
    id: String,
    title: String,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    tables: Vec<TableFile>,
}

fn default_kind() -> String {
    "table".to_string()
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fields: Vec<FieldFile>,
}

#[derive(Debug, Deserialize)]
struct FieldFile {
    name: String,
    #[serde(rename = "type", default)]
    field_type: FieldType,
    #[serde(default)]
    values: Vec<Value>,
    #[serde(default)]
    config: FieldConfig,
}

/// A dashboard together with the query results of its panels
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub dashboard: Dashboard,
    pub data: HashMap<String, Vec<ResultTable>>,
}

/// Parse a snapshot file (YAML or JSON)
pub fn load_snapshot(path: &Path) -> ExportResult<DashboardSnapshot> {
    let content = std::fs::read_to_string(path)?;
    parse_snapshot(&content)
}

/// Parse snapshot text (YAML or JSON)
pub fn parse_snapshot(content: &str) -> ExportResult<DashboardSnapshot> {
    let file: SnapshotFile = serde_yaml::from_str(content)?;

    let mut ids = HashSet::new();
    let mut panels = Vec::with_capacity(file.panels.len());
    let mut data = HashMap::new();

    for panel in file.panels {
        if !ids.insert(panel.id.clone()) {
            return Err(ExportError::Validation(format!(
                "Duplicate panel id '{}'",
                panel.id
            )));
        }

        let tables = panel
            .tables
            .into_iter()
            .map(|t| build_table(&panel.id, t))
            .collect::<ExportResult<Vec<_>>>()?;
        data.insert(panel.id.clone(), tables);

        panels.push(Panel {
            id: panel.id,
            title: panel.title,
            kind: PanelKind::from(panel.kind),
            image_url: panel.image_url,
        });
    }

    Ok(DashboardSnapshot {
        dashboard: Dashboard {
            title: file.title,
            panels,
        },
        data,
    })
}

fn build_table(panel_id: &str, table: TableFile) -> ExportResult<ResultTable> {
    let fields = table
        .fields
        .into_iter()
        .map(|f| {
            let field = Field::new(f.name, f.field_type, f.values).with_config(f.config);
            match ConfiguredPresenter::from_field(&field) {
                Some(presenter) => field.with_presenter(Arc::new(presenter)),
                None => field,
            }
        })
        .collect();

    let result = ResultTable {
        name: table.name,
        fields,
    };
    result
        .validate_lengths()
        .map_err(|e| ExportError::Validation(format!("Panel '{}': {}", panel_id, e)))?;
    Ok(result)
}
