//! Moment-style date format strings
//!
//! Dashboards describe time formats with moment tokens (`YYYY-MM-DD HH:mm:ss`).
//! This module renders instants with them and translates them to Excel
//! number-format codes for the XLSX encoder.
//!
//! Text inside `[...]` is literal. Unrecognized characters pass through.

use chrono::{DateTime, Datelike, Timelike, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
enum DateToken {
    Year4,
    Year2,
    MonthName,
    MonthShort,
    Month2,
    Month,
    DayName,
    DayShort,
    DayOrdinal,
    Day2,
    Day,
    Hour24Padded,
    Hour24,
    Hour12Padded,
    Hour12,
    Minute2,
    Minute,
    Second2,
    Second,
    Millis,
    Meridiem,
    MeridiemLower,
    OffsetColon,
    Offset,
    UnixSeconds,
    Literal(String),
}

/// Longest tokens first so `YYYY` wins over `YY`
const TOKENS: &[(&str, DateToken)] = &[
    ("YYYY", DateToken::Year4),
    ("YY", DateToken::Year2),
    ("MMMM", DateToken::MonthName),
    ("MMM", DateToken::MonthShort),
    ("MM", DateToken::Month2),
    ("M", DateToken::Month),
    ("dddd", DateToken::DayName),
    ("ddd", DateToken::DayShort),
    ("Do", DateToken::DayOrdinal),
    ("DD", DateToken::Day2),
    ("D", DateToken::Day),
    ("HH", DateToken::Hour24Padded),
    ("H", DateToken::Hour24),
    ("hh", DateToken::Hour12Padded),
    ("h", DateToken::Hour12),
    ("mm", DateToken::Minute2),
    ("m", DateToken::Minute),
    ("ss", DateToken::Second2),
    ("s", DateToken::Second),
    ("SSS", DateToken::Millis),
    ("A", DateToken::Meridiem),
    ("a", DateToken::MeridiemLower),
    ("ZZ", DateToken::Offset),
    ("Z", DateToken::OffsetColon),
    ("X", DateToken::UnixSeconds),
];

/// A parsed moment-style format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    source: String,
    tokens: Vec<DateToken>,
}

impl DateFormat {
    pub fn parse(format: &str) -> Self {
        let mut tokens: Vec<DateToken> = Vec::new();
        let mut rest = format;

        while !rest.is_empty() {
            if let Some(after_bracket) = rest.strip_prefix('[') {
                if let Some(end) = after_bracket.find(']') {
                    push_literal(&mut tokens, &after_bracket[..end]);
                    rest = &after_bracket[end + 1..];
                    continue;
                }
            }

            if let Some((pattern, token)) = TOKENS.iter().find(|(p, _)| rest.starts_with(p)) {
                tokens.push(token.clone());
                rest = &rest[pattern.len()..];
                continue;
            }

            let ch = rest.chars().next().unwrap_or_default();
            push_literal(&mut tokens, &ch.to_string());
            rest = &rest[ch.len_utf8()..];
        }

        Self {
            source: format.to_string(),
            tokens,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render an instant (UTC)
    pub fn format(&self, dt: &DateTime<Utc>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                DateToken::Year4 => out.push_str(&format!("{:04}", dt.year())),
                DateToken::Year2 => out.push_str(&format!("{:02}", dt.year().rem_euclid(100))),
                DateToken::MonthName => out.push_str(&dt.format("%B").to_string()),
                DateToken::MonthShort => out.push_str(&dt.format("%b").to_string()),
                DateToken::Month2 => out.push_str(&format!("{:02}", dt.month())),
                DateToken::Month => out.push_str(&dt.month().to_string()),
                DateToken::DayName => out.push_str(&dt.format("%A").to_string()),
                DateToken::DayShort => out.push_str(&dt.format("%a").to_string()),
                DateToken::DayOrdinal => out.push_str(&ordinal(dt.day())),
                DateToken::Day2 => out.push_str(&format!("{:02}", dt.day())),
                DateToken::Day => out.push_str(&dt.day().to_string()),
                DateToken::Hour24Padded => out.push_str(&format!("{:02}", dt.hour())),
                DateToken::Hour24 => out.push_str(&dt.hour().to_string()),
                DateToken::Hour12Padded => out.push_str(&format!("{:02}", dt.hour12().1)),
                DateToken::Hour12 => out.push_str(&dt.hour12().1.to_string()),
                DateToken::Minute2 => out.push_str(&format!("{:02}", dt.minute())),
                DateToken::Minute => out.push_str(&dt.minute().to_string()),
                DateToken::Second2 => out.push_str(&format!("{:02}", dt.second())),
                DateToken::Second => out.push_str(&dt.second().to_string()),
                DateToken::Millis => {
                    out.push_str(&format!("{:03}", dt.timestamp_subsec_millis()))
                }
                DateToken::Meridiem => out.push_str(if dt.hour12().0 { "PM" } else { "AM" }),
                DateToken::MeridiemLower => out.push_str(if dt.hour12().0 { "pm" } else { "am" }),
                DateToken::OffsetColon => out.push_str("+00:00"),
                DateToken::Offset => out.push_str("+0000"),
                DateToken::UnixSeconds => out.push_str(&dt.timestamp().to_string()),
                DateToken::Literal(text) => out.push_str(text),
            }
        }
        out
    }

    /// Excel number-format code for the same layout
    pub fn to_excel(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                DateToken::Year4 => out.push_str("yyyy"),
                DateToken::Year2 => out.push_str("yy"),
                DateToken::MonthName => out.push_str("mmmm"),
                DateToken::MonthShort => out.push_str("mmm"),
                DateToken::Month2 => out.push_str("mm"),
                DateToken::Month => out.push('m'),
                DateToken::DayName => out.push_str("dddd"),
                DateToken::DayShort => out.push_str("ddd"),
                DateToken::DayOrdinal | DateToken::Day => out.push('d'),
                DateToken::Day2 => out.push_str("dd"),
                DateToken::Hour24Padded | DateToken::Hour12Padded => out.push_str("hh"),
                DateToken::Hour24 | DateToken::Hour12 => out.push('h'),
                DateToken::Minute2 => out.push_str("mm"),
                DateToken::Minute => out.push('m'),
                DateToken::Second2 => out.push_str("ss"),
                DateToken::Second => out.push('s'),
                DateToken::Millis => out.push_str("000"),
                DateToken::Meridiem | DateToken::MeridiemLower => out.push_str("AM/PM"),
                // Excel has no offset or epoch codes; serials are written in UTC
                DateToken::OffsetColon | DateToken::Offset | DateToken::UnixSeconds => {}
                DateToken::Literal(text) => out.push_str(&excel_literal(text)),
            }
        }
        out
    }
}

fn push_literal(tokens: &mut Vec<DateToken>, text: &str) {
    if let Some(DateToken::Literal(existing)) = tokens.last_mut() {
        existing.push_str(text);
    } else {
        tokens.push(DateToken::Literal(text.to_string()));
    }
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

/// Separators pass through; everything else is backslash-escaped
fn excel_literal(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            ' ' | '-' | '/' | ':' | '.' | ',' | '(' | ')' => out.push(ch),
            _ => {
                out.push('\\');
                out.push(ch);
            }
        }
    }
    out
}

/// Render `dt` with a moment-style format string
pub fn format_datetime(dt: &DateTime<Utc>, format: &str) -> String {
    DateFormat::parse(format).format(dt)
}
