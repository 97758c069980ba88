//! Timestamp formats and clock checks used by both signature versions.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::AuthError;

/// ISO 8601 basic format used by `x-amz-date` and `X-Amz-Date`.
const ISO8601_BASIC: &str = "%Y%m%dT%H%M%SZ";

/// Format a time as `YYYYMMDDTHHMMSSZ`.
#[must_use]
pub fn format_iso8601(time: DateTime<Utc>) -> String {
    time.format(ISO8601_BASIC).to_string()
}

/// Format the date part of a time as `YYYYMMDD`.
#[must_use]
pub fn format_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d").to_string()
}

/// Parse a `YYYYMMDDTHHMMSSZ` timestamp.
#[must_use]
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, ISO8601_BASIC)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a request date header, accepting ISO 8601 basic or RFC 1123/2822.
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    parse_iso8601(value).or_else(|| {
        DateTime::parse_from_rfc2822(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Convert a second count to a `Duration`, saturating at `Duration::MAX`.
pub(crate) fn saturating_seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Reject a request time further than `max_skew_secs` from `now` in either direction.
pub fn check_clock_skew(
    request_time: DateTime<Utc>,
    now: DateTime<Utc>,
    max_skew_secs: u64,
) -> Result<(), AuthError> {
    let max_skew = saturating_seconds(max_skew_secs);
    if (now - request_time).abs() > max_skew {
        return Err(AuthError::RequestTimeTooSkewed);
    }
    Ok(())
}
