//! Reorder rule evaluation. Pure and deterministic given `(row, now,
//! ttl_hours)`: no I/O, no clock reads.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::models::{InventoryRow, COL_LAST_CHECKED, COL_ON_HAND_QTY, COL_REORDER_THRESHOLD};

/// A cell that could not be interpreted. Rows that fail to parse are
/// excluded from candidacy rather than aborting the cycle (fail-safe).
#[derive(Debug, Error)]
pub enum RowParseError {
    #[error("field `{field}` is not an integer: {value:?}")]
    BadInteger { field: &'static str, value: String },
    #[error("field `{field}` is not an ISO-8601 timestamp: {value:?}")]
    BadTimestamp { field: &'static str, value: String },
}

/// Decides whether a row qualifies for reorder. Qualifies when BOTH hold,
/// strictly: on-hand quantity is below the threshold, and `last_checked` is
/// older than `ttl_hours` (exactly at the boundary does not qualify).
///
/// Any parse failure anywhere in the row excludes it; this masks genuine
/// data errors as "no reorder", which is the documented fail-safe tradeoff.
pub fn needs_reorder(row: &InventoryRow, now: DateTime<Utc>, ttl_hours: i64) -> bool {
    try_needs_reorder(row, now, ttl_hours).unwrap_or(false)
}

/// Same decision, but surfaces the parse failure so callers can log which
/// row was excluded and why.
pub fn try_needs_reorder(
    row: &InventoryRow,
    now: DateTime<Utc>,
    ttl_hours: i64,
) -> Result<bool, RowParseError> {
    let qty = lenient_int(COL_ON_HAND_QTY, row.field(COL_ON_HAND_QTY))?;
    let threshold = lenient_int(COL_REORDER_THRESHOLD, row.field(COL_REORDER_THRESHOLD))?;
    let last_checked = parse_timestamp(COL_LAST_CHECKED, row.field(COL_LAST_CHECKED))?;

    let older_than_ttl = now - last_checked > Duration::hours(ttl_hours);
    Ok(qty < threshold && older_than_ttl)
}

/// Blank cells count as zero; anything else must be a plain integer.
fn lenient_int(field: &'static str, value: &str) -> Result<i64, RowParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse().map_err(|_| RowParseError::BadInteger {
        field,
        value: value.to_string(),
    })
}

/// Accepts RFC 3339, a naive date-time, or a bare date. Naive values are
/// taken as UTC.
fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, RowParseError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc());
    }
    Err(RowParseError::BadTimestamp {
        field,
        value: value.to_string(),
    })
}
