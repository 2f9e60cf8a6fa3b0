//! Field presenter built from field configuration
//!
//! Snapshot files carry no display callbacks, so display text, threshold
//! colors and links are derived from `unit`, `decimals`, `thresholds` and
//! `links` in the field config.

use crate::types::{DisplayValue, Field, FieldPresenter, Link, LinkTemplate, Threshold};
use serde_json::Value;

const BYTE_UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

#[derive(Debug, Clone)]
pub struct ConfiguredPresenter {
    unit: Option<String>,
    decimals: Option<u32>,
    thresholds: Vec<Threshold>,
    links: Vec<LinkTemplate>,
    values: Vec<Value>,
}

impl ConfiguredPresenter {
    /// Presenter for `field`, or `None` when its config asks for no presentation
    pub fn from_field(field: &Field) -> Option<Self> {
        let config = &field.config;
        let unit = config
            .unit
            .clone()
            .filter(|u| !u.is_empty() && !u.starts_with("time:") && u != "none");

        if unit.is_none()
            && config.decimals.is_none()
            && config.thresholds.is_empty()
            && config.links.is_empty()
        {
            return None;
        }

        let mut thresholds = config.thresholds.clone();
        // Base step (no value) first, then ascending
        thresholds.sort_by(|a, b| match (a.value, b.value) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => x.total_cmp(&y),
        });

        Some(Self {
            unit,
            decimals: config.decimals,
            thresholds,
            links: config.links.clone(),
            values: field.values.clone(),
        })
    }

    fn threshold_color(&self, value: Option<f64>) -> Option<String> {
        let mut color = None;
        for step in &self.thresholds {
            match (step.value, value) {
                (None, _) => color = Some(step.color.clone()),
                (Some(limit), Some(v)) if v >= limit => color = Some(step.color.clone()),
                _ => break,
            }
        }
        color
    }

    fn format_number(&self, n: f64) -> DisplayValue {
        let (scaled, prefix, suffix) = match self.unit.as_deref() {
            Some("percent") => (n, None, Some("%".to_string())),
            Some("percentunit") => (n * 100.0, None, Some("%".to_string())),
            Some("currencyUSD") => (n, Some("$".to_string()), None),
            Some("bytes") => {
                let (v, unit) = scale_bytes(n);
                (v, None, Some(format!(" {unit}")))
            }
            Some(unit) => {
                if let Some(p) = unit.strip_prefix("prefix:") {
                    (n, Some(p.to_string()), None)
                } else if let Some(s) = unit.strip_prefix("suffix:") {
                    (n, None, Some(s.to_string()))
                } else {
                    (n, None, Some(format!(" {unit}")))
                }
            }
            None => (n, None, None),
        };

        DisplayValue {
            text: format_decimals(scaled, self.decimals),
            prefix,
            suffix,
            color: None,
        }
    }

    fn render(&self, value: &Value) -> DisplayValue {
        match value {
            Value::Number(n) => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                let mut dv = self.format_number(f);
                dv.color = self.threshold_color(Some(f));
                dv
            }
            Value::Null => DisplayValue {
                color: self.threshold_color(None),
                ..Default::default()
            },
            Value::String(s) => DisplayValue {
                text: s.clone(),
                color: self.threshold_color(None),
                ..Default::default()
            },
            other => DisplayValue {
                text: other.to_string(),
                color: self.threshold_color(None),
                ..Default::default()
            },
        }
    }
}

impl FieldPresenter for ConfiguredPresenter {
    fn display(&self, value: &Value) -> Option<DisplayValue> {
        Some(self.render(value))
    }

    fn links(&self, row: usize) -> Vec<Link> {
        if self.links.is_empty() {
            return Vec::new();
        }
        let raw = self.values.get(row).cloned().unwrap_or(Value::Null);
        let raw_text = match &raw {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let text = self.render(&raw).to_display_string();

        self.links
            .iter()
            .map(|template| Link {
                title: interpolate(&template.title, &raw_text, &text, row),
                href: interpolate(&template.url, &raw_text, &text, row),
            })
            .collect()
    }
}

fn interpolate(template: &str, raw: &str, text: &str, row: usize) -> String {
    template
        .replace("${__value.raw}", raw)
        .replace("${__value.text}", text)
        .replace("${__row}", &row.to_string())
}

fn format_decimals(n: f64, decimals: Option<u32>) -> String {
    match decimals {
        Some(d) => format!("{:.*}", d as usize, n),
        None => {
            // Up to 6 decimals, trailing zeros removed
            let rounded = (n * 1e6).round() / 1e6;
            let text = format!("{:.6}", rounded);
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}

fn scale_bytes(n: f64) -> (f64, &'static str) {
    let mut value = n;
    let mut idx = 0;
    while value.abs() >= 1024.0 && idx < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    (value, BYTE_UNITS[idx])
}
