#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw remote record shape and change-feed event types.
//!
//! The remote store speaks in database rows: `snake_case` column names,
//! nullable columns, and numeric columns that some transports serialize as
//! strings. [`RawHazardRecord`] captures that shape as leniently as
//! possible so a single odd row never fails a whole page; turning it into
//! a canonical report is the job of the normalizer in `ocean_watch_source`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A numeric column that may arrive either as a JSON number or as a string
/// (Postgres `numeric` columns are commonly rendered as strings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    /// A native JSON number.
    Number(f64),
    /// A number rendered as text.
    Text(String),
}

impl RawNumber {
    /// Returns the numeric value, parsing text if necessary.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A hazard report row exactly as the remote store returns it.
///
/// Every column is optional here; required-ness is enforced during
/// normalization so that missing fields are reported per record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHazardRecord {
    /// Row primary key.
    pub id: Option<String>,
    /// Hazard type wire name (e.g. `"storm_surge"`).
    pub hazard_type: Option<String>,
    /// Reporter description.
    pub description: Option<String>,
    /// Latitude column.
    pub latitude: Option<RawNumber>,
    /// Longitude column.
    pub longitude: Option<RawNumber>,
    /// Media URL array column; `null` when nothing was uploaded.
    pub media_urls: Option<Vec<String>>,
    /// Severity wire name.
    pub severity: Option<String>,
    /// Verification status wire name.
    pub verification_status: Option<String>,
    /// Reporting user, `null` for anonymous submissions.
    pub reported_by: Option<String>,
    /// Locale code.
    pub language: Option<String>,
    /// Row creation time.
    pub created_at: Option<String>,
    /// Row last-modified time.
    pub updated_at: Option<String>,
}

/// The three kinds of event a change feed delivers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    /// A new row was created.
    Insert,
    /// An existing row was modified.
    Update,
    /// A row was removed.
    Delete,
}

/// One event delivered by a remote change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent {
    /// A row was created; carries the new row.
    Insert {
        /// The inserted row.
        record: RawHazardRecord,
    },
    /// A row was modified; carries the row after the change.
    Update {
        /// The updated row.
        record: RawHazardRecord,
    },
    /// A row was removed; carries only its primary key.
    Delete {
        /// Primary key of the removed row.
        id: String,
    },
}

impl ChangeEvent {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert { .. } => ChangeKind::Insert,
            Self::Update { .. } => ChangeKind::Update,
            Self::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// Returns the row ID this event refers to, if known.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::Insert { record } | Self::Update { record } => record.id.as_deref(),
            Self::Delete { id } => Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_number_accepts_numbers_and_strings() {
        let row: RawHazardRecord =
            serde_json::from_str(r#"{"id":"a","latitude":13.05,"longitude":"80.25"}"#).unwrap();
        assert_eq!(row.latitude.and_then(|n| n.as_f64()), Some(13.05));
        assert_eq!(row.longitude.and_then(|n| n.as_f64()), Some(80.25));
    }

    #[test]
    fn raw_number_rejects_garbage_text() {
        assert_eq!(RawNumber::Text("north".to_string()).as_f64(), None);
    }

    #[test]
    fn missing_and_null_columns_are_none() {
        let row: RawHazardRecord =
            serde_json::from_str(r#"{"id":"a","media_urls":null,"unknown_column":1}"#).unwrap();
        assert_eq!(row.media_urls, None);
        assert_eq!(row.reported_by, None);
    }

    #[test]
    fn event_accessors() {
        let insert = ChangeEvent::Insert {
            record: RawHazardRecord {
                id: Some("r1".to_string()),
                ..RawHazardRecord::default()
            },
        };
        assert_eq!(insert.kind(), ChangeKind::Insert);
        assert_eq!(insert.record_id(), Some("r1"));

        let delete = ChangeEvent::Delete {
            id: "r2".to_string(),
        };
        assert_eq!(delete.kind().to_string(), "DELETE");
        assert_eq!(delete.record_id(), Some("r2"));
    }
}
