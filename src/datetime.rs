//! Date/time utilities for Lumina.
//!
//! Timestamps are stored as fixed-width UTC text so that SQL string
//! comparisons order them chronologically.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::{LuminaError, Result};

/// Storage format for timestamps (always microsecond precision).
pub const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Encode a UTC timestamp for storage.
pub fn to_db(dt: &DateTime<Utc>) -> String {
    dt.format(DB_FORMAT).to_string()
}

/// Decode a stored timestamp.
///
/// Accepts the storage format as well as SQLite's `datetime('now')` output
/// and RFC3339.
pub fn from_db(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LuminaError::Internal(format!("bad stored timestamp {s:?}: {e}")))
}

/// Current time in storage format.
pub fn now_db() -> String {
    to_db(&Utc::now())
}

/// Latest instant whose encoding still has a four-digit year.
///
/// Later years are written with a leading `+` and compare below every
/// four-digit year in SQL.
pub fn max_storable() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Reject timestamps that would not sort correctly once stored.
pub fn ensure_storable(dt: &DateTime<Utc>) -> Result<()> {
    if *dt > max_storable() {
        return Err(LuminaError::Validation(format!(
            "timestamp {dt} is beyond the year 9999"
        )));
    }
    Ok(())
}

/// `base + duration`, or a validation error if the result overflows or
/// cannot be stored.
pub fn checked_deadline(base: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>> {
    let deadline = base
        .checked_add_signed(duration)
        .ok_or_else(|| LuminaError::Validation("deadline is out of range".to_string()))?;
    ensure_storable(&deadline)?;
    Ok(deadline)
}
