//! Raw row to canonical report normalization.
//!
//! Field renaming, enum coercion, numeric coercion, and defaulting of
//! optional columns. A row either normalizes completely or is rejected
//! with a [`NormalizeError`]; nothing is ever partially ingested.

use std::str::FromStr;

use ocean_watch_hazard_models::{
    HazardReport, HazardType, InvalidCoordinateError, SeverityLevel, VerificationStatus,
    validate_coordinates,
};
use ocean_watch_source_models::RawHazardRecord;

use crate::parsing::{parse_lat_lng, parse_timestamp};

/// Reporter name used when a row has no `reported_by`.
pub const ANONYMOUS_REPORTER: &str = "anonymous";

/// Locale used when a row has no `language`.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Reasons a raw row cannot become a [`HazardReport`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// A required column was absent, null, or blank.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Column name.
        field: &'static str,
    },

    /// An enum column held a value outside the taxonomy.
    #[error("invalid value {value:?} for `{field}`")]
    InvalidEnum {
        /// Column name.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Latitude/longitude could not be read as numbers.
    #[error("latitude/longitude are not numeric")]
    InvalidNumber,

    /// Coordinates were numeric but out of range.
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinateError),

    /// `created_at` could not be parsed.
    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp {
        /// The rejected value.
        value: String,
    },
}

fn required<'a>(value: Option<&'a String>, field: &'static str) -> Result<&'a str, NormalizeError> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or(NormalizeError::MissingField { field })
}

fn parse_enum<T: FromStr>(value: &str, field: &'static str) -> Result<T, NormalizeError> {
    T::from_str(value).map_err(|_| NormalizeError::InvalidEnum {
        field,
        value: value.to_string(),
    })
}

fn non_blank_or(value: Option<&String>, default: &str) -> String {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Normalizes one raw row into a canonical report.
///
/// `verification_status` falls back to `pending` when absent (the remote
/// column default); a present but unknown value is still an error.
///
/// # Errors
///
/// Returns [`NormalizeError`] if a required column is missing, an enum
/// value is outside the taxonomy, or the coordinates/timestamp are invalid.
pub fn normalize_record(raw: &RawHazardRecord) -> Result<HazardReport, NormalizeError> {
    let id = required(raw.id.as_ref(), "id")?;
    let hazard_type: HazardType =
        parse_enum(required(raw.hazard_type.as_ref(), "hazard_type")?, "hazard_type")?;
    let severity: SeverityLevel =
        parse_enum(required(raw.severity.as_ref(), "severity")?, "severity")?;
    let verification_status = match raw
        .verification_status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(value) => parse_enum(value, "verification_status")?,
        None => VerificationStatus::Pending,
    };

    if raw.latitude.is_none() {
        return Err(NormalizeError::MissingField { field: "latitude" });
    }
    if raw.longitude.is_none() {
        return Err(NormalizeError::MissingField { field: "longitude" });
    }
    let (latitude, longitude) = parse_lat_lng(raw.latitude.as_ref(), raw.longitude.as_ref())
        .ok_or(NormalizeError::InvalidNumber)?;
    validate_coordinates(latitude, longitude)?;

    let created_at = required(raw.created_at.as_ref(), "created_at")?;
    let timestamp = parse_timestamp(created_at).ok_or_else(|| NormalizeError::InvalidTimestamp {
        value: created_at.to_string(),
    })?;

    Ok(HazardReport {
        id: id.to_string(),
        hazard_type,
        description: raw.description.clone().unwrap_or_default(),
        latitude,
        longitude,
        media_urls: raw.media_urls.clone().unwrap_or_default(),
        timestamp,
        reported_by: non_blank_or(raw.reported_by.as_ref(), ANONYMOUS_REPORTER),
        verification_status,
        severity,
        language: non_blank_or(raw.language.as_ref(), DEFAULT_LANGUAGE),
    })
}

/// Normalizes a batch of rows, dropping (and logging) every row that fails.
#[must_use]
pub fn normalize_all(raws: &[RawHazardRecord]) -> Vec<HazardReport> {
    let mut reports = Vec::with_capacity(raws.len());
    let mut dropped = 0usize;

    for raw in raws {
        match normalize_record(raw) {
            Ok(report) => reports.push(report),
            Err(e) => {
                dropped += 1;
                log::warn!(
                    "Dropping malformed hazard row id={}: {e}",
                    raw.id.as_deref().unwrap_or("<none>")
                );
            }
        }
    }

    if dropped > 0 {
        log::info!(
            "Normalized {} of {} hazard rows ({dropped} dropped)",
            reports.len(),
            raws.len()
        );
    }

    reports
}

#[cfg(test)]
mod tests {
    use ocean_watch_source_models::RawNumber;

    use super::*;

    fn row() -> RawHazardRecord {
        RawHazardRecord {
            id: Some("r1".to_string()),
            hazard_type: Some("storm_surge".to_string()),
            description: Some("Water over the promenade".to_string()),
            latitude: Some(RawNumber::Number(13.05)),
            longitude: Some(RawNumber::Text("80.28".to_string())),
            media_urls: None,
            severity: Some("high".to_string()),
            verification_status: Some("verified".to_string()),
            reported_by: None,
            language: None,
            created_at: Some("2025-06-01T10:00:00Z".to_string()),
            updated_at: None,
        }
    }

    #[test]
    fn normalizes_complete_row() {
        let report = normalize_record(&row()).unwrap();
        assert_eq!(report.id, "r1");
        assert_eq!(report.hazard_type, HazardType::StormSurge);
        assert_eq!(report.severity, SeverityLevel::High);
        assert_eq!(report.verification_status, VerificationStatus::Verified);
        assert!((report.longitude - 80.28).abs() < f64::EPSILON);
        assert!(report.media_urls.is_empty());
        assert_eq!(report.reported_by, ANONYMOUS_REPORTER);
        assert_eq!(report.language, DEFAULT_LANGUAGE);
        assert_eq!(report.timestamp.to_rfc3339(), "2025-06-01T10:00:00+00:00");
    }

    #[test]
    fn enum_coercion_is_case_insensitive() {
        let mut raw = row();
        raw.hazard_type = Some(" High_Waves ".to_string());
        raw.severity = Some("CRITICAL".to_string());
        let report = normalize_record(&raw).unwrap();
        assert_eq!(report.hazard_type, HazardType::HighWaves);
        assert_eq!(report.severity, SeverityLevel::Critical);
    }

    #[test]
    fn missing_verification_defaults_to_pending() {
        let mut raw = row();
        raw.verification_status = None;
        assert_eq!(
            normalize_record(&raw).unwrap().verification_status,
            VerificationStatus::Pending
        );
    }

    #[test]
    fn rejects_unknown_hazard_type() {
        let mut raw = row();
        raw.hazard_type = Some("earthquake".to_string());
        assert_eq!(
            normalize_record(&raw),
            Err(NormalizeError::InvalidEnum {
                field: "hazard_type",
                value: "earthquake".to_string(),
            })
        );
    }

    #[test]
    fn rejects_missing_fields() {
        let mut raw = row();
        raw.id = Some("   ".to_string());
        assert_eq!(
            normalize_record(&raw),
            Err(NormalizeError::MissingField { field: "id" })
        );

        let mut raw = row();
        raw.latitude = None;
        assert_eq!(
            normalize_record(&raw),
            Err(NormalizeError::MissingField { field: "latitude" })
        );

        let mut raw = row();
        raw.created_at = None;
        assert_eq!(
            normalize_record(&raw),
            Err(NormalizeError::MissingField {
                field: "created_at"
            })
        );
    }

    #[test]
    fn rejects_bad_coordinates_and_timestamps() {
        let mut raw = row();
        raw.latitude = Some(RawNumber::Number(95.0));
        assert!(matches!(
            normalize_record(&raw),
            Err(NormalizeError::InvalidCoordinate(_))
        ));

        let mut raw = row();
        raw.longitude = Some(RawNumber::Text("east".to_string()));
        assert_eq!(normalize_record(&raw), Err(NormalizeError::InvalidNumber));

        let mut raw = row();
        raw.created_at = Some("last tuesday".to_string());
        assert!(matches!(
            normalize_record(&raw),
            Err(NormalizeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn keeps_media_and_reporter_when_present() {
        let mut raw = row();
        raw.media_urls = Some(vec!["https://cdn.example/a.jpg".to_string()]);
        raw.reported_by = Some("user-42".to_string());
        raw.language = Some("ta".to_string());
        let report = normalize_record(&raw).unwrap();
        assert_eq!(report.media_urls, vec!["https://cdn.example/a.jpg"]);
        assert_eq!(report.reported_by, "user-42");
        assert_eq!(report.language, "ta");
    }

    #[test]
    fn normalize_all_drops_only_bad_rows() {
        let mut bad = row();
        bad.id = Some("r2".to_string());
        bad.severity = Some("apocalyptic".to_string());
        let mut good = row();
        good.id = Some("r3".to_string());

        let reports = normalize_all(&[row(), bad, good]);
        let ids: Vec<_> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
    }
}
