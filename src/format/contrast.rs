//! Contrasting foreground color for colored cell backgrounds

use crate::error::{ExportError, ExportResult};
use regex::Regex;

pub const BLACK: &str = "#000000";
pub const WHITE: &str = "#ffffff";

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional) into RGB channels.
///
/// An alpha pair is ignored.
pub fn parse_hex_color(color: &str) -> ExportResult<(u8, u8, u8)> {
    let short_pattern = Regex::new(r"^#?([[:xdigit:]])([[:xdigit:]])([[:xdigit:]])$")
        .map_err(|e| ExportError::Parse(format!("Regex error: {}", e)))?;
    let long_pattern =
        Regex::new(r"^#?([[:xdigit:]]{2})([[:xdigit:]]{2})([[:xdigit:]]{2})(?:[[:xdigit:]]{2})?$")
            .map_err(|e| ExportError::Parse(format!("Regex error: {}", e)))?;

    let trimmed = color.trim();
    let expanded = match short_pattern.captures(trimmed) {
        Some(caps) => format!(
            "#{0}{0}{1}{1}{2}{2}",
            &caps[1], &caps[2], &caps[3]
        ),
        None => trimmed.to_string(),
    };

    let caps = long_pattern
        .captures(&expanded)
        .ok_or_else(|| ExportError::ColorParse(color.to_string()))?;

    let channel = |i: usize| {
        u8::from_str_radix(&caps[i], 16).map_err(|_| ExportError::ColorParse(color.to_string()))
    };
    Ok((channel(1)?, channel(2)?, channel(3)?))
}

/// Relative luminance in `0.0..=1.0`
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0
}

/// Black for light backgrounds, white for dark ones. No background, no result.
pub fn compute_contrast_color(background: Option<&str>) -> ExportResult<Option<&'static str>> {
    let Some(background) = background else {
        return Ok(None);
    };
    let (r, g, b) = parse_hex_color(background)?;
    Ok(Some(contrast_for_luminance(luminance(r, g, b))))
}

/// Black strictly above 0.5, white otherwise
pub fn contrast_for_luminance(luminance: f64) -> &'static str {
    if luminance > 0.5 {
        BLACK
    } else {
        WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_background_gets_white() {
        assert_eq!(compute_contrast_color(Some("#000000")).unwrap(), Some(WHITE));
    }

    #[test]
    fn test_white_background_gets_black() {
        assert_eq!(compute_contrast_color(Some("#FFFFFF")).unwrap(), Some(BLACK));
    }

    #[test]
    fn test_short_hex_expands() {
        assert_eq!(parse_hex_color("#fff").unwrap(), (255, 255, 255));
        assert_eq!(parse_hex_color("#f80").unwrap(), (0xff, 0x88, 0x00));
        assert_eq!(compute_contrast_color(Some("#fff")).unwrap(), Some(BLACK));
    }

    #[test]
    fn test_missing_hash_and_alpha() {
        assert_eq!(parse_hex_color("73BF69").unwrap(), (0x73, 0xbf, 0x69));
        assert_eq!(parse_hex_color("#73BF6980").unwrap(), (0x73, 0xbf, 0x69));
    }

    #[test]
    fn test_no_background_no_color() {
        assert_eq!(compute_contrast_color(None).unwrap(), None);
    }

    #[test]
    fn test_malformed_color_is_error() {
        for bad in ["green", "#12345", "rgb(0,0,0)", "", "#ggg"] {
            let err = compute_contrast_color(Some(bad)).unwrap_err();
            assert!(matches!(err, ExportError::ColorParse(_)), "{bad}");
        }
    }

    #[test]
    fn test_midpoint_is_white() {
        assert_eq!(contrast_for_luminance(0.5), WHITE);
        assert_eq!(contrast_for_luminance(0.500_001), BLACK);
    }

    #[test]
    fn test_grays_either_side_of_midpoint() {
        assert!(luminance(0x80, 0x80, 0x80) > 0.5);
        assert!(luminance(0x7f, 0x7f, 0x7f) < 0.5);
        assert_eq!(compute_contrast_color(Some("#808080")).unwrap(), Some(BLACK));
        assert_eq!(compute_contrast_color(Some("#7f7f7f")).unwrap(), Some(WHITE));
    }
}
