//! ISO-8601 timestamps as stored in every table.
//!
//! All timestamps are UTC with millisecond precision and a `Z` suffix, so
//! comparing them as strings (which SQLite does) orders them in time.

use chrono::{DateTime, SecondsFormat, Utc};

/// The current instant, formatted for storage.
pub fn now() -> String {
    format(Utc::now())
}

pub fn format(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Rewrites an RFC 3339 value in the stored form (UTC, millis, `Z`).
///
/// Returns `None` when `value` does not parse.
pub fn normalize(value: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|instant| format(instant.with_timezone(&Utc)))
}

/// Returns the later of two stored timestamps.
///
/// Unparseable values fall back to plain string comparison.
pub fn latest<'a>(a: &'a str, b: &'a str) -> &'a str {
    match (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(x), Ok(y)) => {
            if y > x {
                b
            } else {
                a
            }
        }
        _ => {
            if b > a {
                b
            } else {
                a
            }
        }
    }
}
