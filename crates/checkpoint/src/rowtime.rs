//! Parsing and formatting of `lastpoll_rowtime` values.
//!
//! Checkpoints are written as RFC 3339 UTC with a `Z` suffix and as many
//! fractional digits as the source timestamp carries, so a later
//! `WHERE time > <checkpoint>` never re-reads the row that produced it.
//! Stored values written by other tools may use the PostgreSQL text form
//! (`2023-07-26 23:59:33.504+00`); both are accepted on read.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Parse a stored rowtime. `Ok(None)` for the empty string (poll from epoch).
pub fn parse_rowtime(s: &str) -> Result<Option<DateTime<Utc>>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    // PostgreSQL text output: space separator, optional minutes in the offset
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    // No offset at all: the source stores UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Some(naive.and_utc()));
    }

    Err(format!("unrecognized rowtime '{s}'"))
}

/// Format a rowtime for storage.
pub fn format_rowtime(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
