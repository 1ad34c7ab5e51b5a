//! Time handling utilities for radar capture times and archive queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Format of the capture timestamp token embedded in ODIM file names.
pub const CAPTURE_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Number of digits in a capture timestamp token.
pub const CAPTURE_STAMP_LEN: usize = 14;

/// Parse an ISO 8601 timestamp into UTC.
///
/// Accepts RFC 3339 (`Z` or numeric offset), naive date-times which are
/// taken as UTC (with or without fractional seconds), and plain dates.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // Try date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Parse a 14-digit `YYYYMMDDHHMMSS` capture token as UTC.
///
/// Returns `None` unless the token is exactly 14 ASCII digits forming a
/// valid calendar time.
pub fn parse_capture_stamp(token: &str) -> Option<DateTime<Utc>> {
    if token.len() != CAPTURE_STAMP_LEN || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(token, CAPTURE_STAMP_FORMAT)
        .ok()
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Format a capture time as a 14-digit token.
pub fn format_capture_stamp(time: &DateTime<Utc>) -> String {
    time.format(CAPTURE_STAMP_FORMAT).to_string()
}

/// An inclusive time range for archive queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Parse a range from two ISO 8601 strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeParseError> {
        Ok(Self::new(parse_iso8601(start)?, parse_iso8601(end)?))
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}
