//! Shared parsing utilities for remote hazard rows.
//!
//! Timestamp and coordinate coercion plus lenient decoding of row arrays,
//! used by every transport and by the normalizer.

use chrono::{DateTime, NaiveDateTime, Utc};
use ocean_watch_source_models::{RawHazardRecord, RawNumber};

/// Parses a remote timestamp.
///
/// Accepts RFC 3339 (`2024-01-15T14:30:00.123+00:00`), Postgres text output
/// with an hour-only offset (`2024-01-15 14:30:00.123+00`), and naive
/// datetimes with either a `T` or a space separator, which are taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Parses lat/lng from optional raw numeric columns. Returns `None` if
/// either is missing or not a finite number.
#[must_use]
pub fn parse_lat_lng(lat: Option<&RawNumber>, lng: Option<&RawNumber>) -> Option<(f64, f64)> {
    let latitude = lat?.as_f64()?;
    let longitude = lng?.as_f64()?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    Some((latitude, longitude))
}

/// Decodes a JSON array of rows, skipping (and logging) any element that
/// does not have the shape of a row at all.
///
/// A non-array body yields an empty list.
#[must_use]
pub fn parse_raw_records(body: serde_json::Value) -> Vec<RawHazardRecord> {
    let serde_json::Value::Array(items) = body else {
        log::warn!("Expected a JSON array of hazard rows, got {}", type_name(&body));
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(
            |(idx, item)| match serde_json::from_value::<RawHazardRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping undecodable hazard row #{idx}: {e}");
                    None
                }
            },
        )
        .collect()
}

const fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
