//! File and worksheet naming

use crate::format::format_datetime;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

const MAX_SHEET_NAME: usize = 31;

/// Replace characters that are unsafe in file names
pub fn sanitize_file_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}

/// `<dashboard-title>-<timestamp>.<ext>`
pub fn export_file_name(title: &str, now: &DateTime<Utc>, timestamp_format: &str, ext: &str) -> String {
    format!(
        "{}-{}.{}",
        sanitize_file_component(title),
        sanitize_file_component(&format_datetime(now, timestamp_format)),
        ext
    )
}

/// Hands out valid, unique worksheet names
#[derive(Debug, Default)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Excel forbids `[]:*?/\`, limits names to 31 characters and compares
    /// them case-insensitively.
    pub fn next_name(&mut self, title: &str) -> String {
        let cleaned: String = title
            .chars()
            .map(|c| match c {
                '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
                c => c,
            })
            .collect();
        let cleaned = cleaned.trim().trim_matches('\'').to_string();
        let base = if cleaned.is_empty() {
            format!("Sheet{}", self.used.len() + 1)
        } else {
            cleaned
        };

        let mut candidate = truncate_name(&base, MAX_SHEET_NAME);
        let mut n = 2;
        while self.used.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME - suffix.chars().count();
            candidate = truncate_name(&base, keep) + &suffix;
            n += 1;
        }

        self.used.insert(candidate.to_lowercase());
        candidate
    }
}

/// First `max` characters; a cut may not leave a trailing apostrophe or space
fn truncate_name(name: &str, max: usize) -> String {
    let cut: String = name.chars().take(max).collect();
    cut.trim_end_matches(|c: char| c == '\'' || c.is_whitespace())
        .to_string()
}
