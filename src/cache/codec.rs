//! Value Codec Module
//!
//! JSON encoding for cached values with a date-aware transform.
//!
//! Any object field whose name ends in `Date`, `_at` or `At` and whose value
//! is a timestamp is rewritten to canonical ISO-8601 UTC text, both when
//! writing and when reading. The fraction always carries at least three digits
//! and grows to six or nine when the timestamp needs them, so no precision is
//! lost. The field name alone decides whether the transform applies.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Field-name suffixes that mark a timestamp field.
pub const DATE_FIELD_SUFFIXES: [&str; 3] = ["Date", "_at", "At"];

// == Encode ==
/// Serializes `value` to JSON text.
///
/// Returns `None` when the value is absent (serializes to `null`), which
/// callers treat as a delete.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Option<String>> {
    let mut tree = serde_json::to_value(value)?;
    if tree.is_null() {
        return Ok(None);
    }
    normalize_dates(&mut tree);
    Ok(Some(serde_json::to_string(&tree)?))
}

// == Decode ==
/// Parses JSON text produced by [`encode`] back into `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let mut tree: Value = serde_json::from_str(text)?;
    normalize_dates(&mut tree);
    Ok(serde_json::from_value(tree)?)
}

/// Returns true if `name` marks a timestamp field.
pub fn is_date_field(name: &str) -> bool {
    DATE_FIELD_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

// == Tree Walk ==
/// Rewrites every timestamp under a date-named field to canonical ISO text.
pub fn normalize_dates(tree: &mut Value) {
    match tree {
        Value::Object(map) => {
            for (name, value) in map.iter_mut() {
                if is_date_field(name) {
                    if let Some(iso) = canonical_timestamp(value) {
                        *value = Value::String(iso);
                        continue;
                    }
                }
                normalize_dates(value);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_dates),
        _ => {}
    }
}

/// Parses a timestamp-like value and formats it as `YYYY-MM-DDTHH:MM:SS.sssZ`,
/// widening the fraction for sub-millisecond timestamps.
fn canonical_timestamp(value: &Value) -> Option<String> {
    let text = value.as_str()?;
    let parsed = parse_timestamp(text)?;
    Some(parsed.to_rfc3339_opts(fraction_format(parsed.nanosecond()), true))
}

fn fraction_format(nanos: u32) -> SecondsFormat {
    if nanos % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else if nanos % 1_000 == 0 {
        SecondsFormat::Micros
    } else {
        SecondsFormat::Nanos
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset-less forms are taken as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
