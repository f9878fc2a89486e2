//! Lenient decoding of stored subscription dates.
//!
//! Documents written over the years carry dates as RFC 3339 strings, bare
//! calendar dates, JavaScript epoch milliseconds, or `{seconds, nanoseconds}`
//! objects (with or without a leading underscore on the keys). Anything that
//! cannot be read decodes to `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Decode a JSON value into a UTC timestamp.
#[must_use]
pub fn from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_str(s),
        Value::Number(n) => {
            if let Some(ms) = n.as_i64() {
                DateTime::from_timestamp_millis(ms)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .and_then(|f| DateTime::from_timestamp_millis(f.floor() as i64))
            }
        }
        Value::Object(map) => from_epoch_object(map),
        _ => None,
    }
}

/// Parse a date string: RFC 3339, naive date-time (taken as UTC), or a bare date.
#[must_use]
pub fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn from_epoch_object(map: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let seconds = map
        .get("seconds")
        .or_else(|| map.get("_seconds"))
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.floor() as i64)))?;

    let nanos = map
        .get("nanoseconds")
        .or_else(|| map.get("_nanoseconds"))
        .and_then(Value::as_u64)
        .filter(|n| *n < 1_000_000_000)
        .unwrap_or(0);

    DateTime::from_timestamp(seconds, nanos as u32)
}

/// `deserialize_with` helper that never fails on malformed dates.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(from_value(&value))
}
