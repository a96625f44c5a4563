//! Scalar field normalization shared by all dialects

use chrono::NaiveDate;
use tracing::warn;
use url::Url;

/// Date formats accepted for date-like fields, tried in order
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// `Some(value)` unless the value is empty after trimming
///
/// The returned value is not trimmed.
pub fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse a latitude/longitude cell
///
/// Unparsable values become `None` (no coordinate) with a warning; empty
/// cells become `None` silently.
pub fn parse_coordinate(field: &str, value: &str, context: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(field, value, context, "Unparsable coordinate, treating as absent");
            None
        }
    }
}

/// Normalize a date or date-time string to an ISO date (`YYYY-MM-DD`)
///
/// Only the date part is considered (`2021-03-15 10:00`,
/// `2021-03-15T10:00:00`), so any time component is discarded. Empty input yields `None`. A value in no known
/// format is logged and yields `None`.
pub fn parse_iso_date(field: &str, value: &str, context: &str) -> Option<String> {
    let token = value.split_whitespace().next()?;
    let token = token.split('T').next().unwrap_or(token);

    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok());

    match parsed {
        Some(date) => Some(date.format("%Y-%m-%d").to_string()),
        None => {
            warn!(field, value, context, "Unrecognized date format, treating as absent");
            None
        }
    }
}

/// Give scheme-less website addresses an `http://` prefix
pub fn normalize_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(trimmed.to_string()),
        _ => Some(format!("http://{}", trimmed.trim_start_matches('/'))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("   "), None);
        assert_eq!(non_empty(" x "), Some(" x ".to_string()));
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("Latitude", "49.1043", "line 1"), Some(49.1043));
        assert_eq!(parse_coordinate("Latitude", " -122.65 ", "line 1"), Some(-122.65));
        assert_eq!(parse_coordinate("Latitude", "", "line 1"), None);
        assert_eq!(parse_coordinate("Latitude", "north", "line 1"), None);
        assert_eq!(parse_coordinate("Latitude", "NaN", "line 1"), None);
    }

    #[test]
    fn test_parse_iso_date_formats() {
        assert_eq!(
            parse_iso_date("LastVerifiedOn", "03/15/2019", "line 1").as_deref(),
            Some("2019-03-15")
        );
        assert_eq!(
            parse_iso_date("LastVerifiedOn", "2019-03-15", "line 1").as_deref(),
            Some("2019-03-15")
        );
        assert_eq!(
            parse_iso_date("LastVerifiedOn", "3/5/2019 10:42:00 AM", "line 1").as_deref(),
            Some("2019-03-05")
        );
        assert_eq!(
            parse_iso_date("LastVerifiedOn", "2019-03-15T08:30:00Z", "line 1").as_deref(),
            Some("2019-03-15")
        );
        assert_eq!(parse_iso_date("LastVerifiedOn", "", "line 1"), None);
        assert_eq!(parse_iso_date("LastVerifiedOn", "yesterday", "line 1"), None);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("www.langleyfoodbank.ca").as_deref(),
            Some("http://www.langleyfoodbank.ca")
        );
        assert_eq!(
            normalize_url("https://example.org/path").as_deref(),
            Some("https://example.org/path")
        );
        assert_eq!(
            normalize_url("example.org:8080").as_deref(),
            Some("http://example.org:8080")
        );
        assert_eq!(normalize_url(" "), None);
    }
}
