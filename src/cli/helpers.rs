//! Shared helper functions for CLI commands
//!
//! Formatting and parsing used across the command modules.

use chrono::{DateTime, NaiveDate, Utc};
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};
use std::io::IsTerminal;

use crate::core::identity::EntityId;

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_opt_date(date: Option<DateTime<Utc>>) -> String {
    date.map(format_date).unwrap_or_else(|| "-".to_string())
}

pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// "-" for empty text
pub fn or_dash(s: &str) -> String {
    if s.trim().is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

/// Parse a date argument: `YYYY-MM-DD`, RFC 3339, `today` or `now`
///
/// Plain dates are taken at midnight UTC.
pub fn parse_date(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("today") || s.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

/// Parse a non-negative amount of money
pub fn parse_amount(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("invalid amount '{}'", s))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("amount must be zero or positive, got '{}'", s))
    }
}

/// Ask for confirmation unless `assume_yes` is set
///
/// Without a terminal the answer is no, so scripts must pass `--yes`.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_format_short_id() {
        let id = EntityId::new(EntityPrefix::Mat);
        let formatted = format_short_id(&id);
        // MAT- plus a 26 char ULID is always truncated
        assert_eq!(formatted.len(), 16);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("perceuse à colonne", 10), "perceus...");
    }

    #[test]
    fn test_parse_date_forms() {
        let d = parse_date("2024-03-05").unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2024, 3, 5, 0));

        let d = parse_date("2024-03-05T10:30:00+02:00").unwrap();
        assert_eq!(d.hour(), 8);

        assert!(parse_date("today").is_ok());
        assert!(parse_date("05/03/2024").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.5"), Ok(12.5));
        assert_eq!(parse_amount("12,5"), Ok(12.5));
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(""), "-");
        assert_eq!(or_dash("  "), "-");
        assert_eq!(or_dash("x"), "x");
    }
}
