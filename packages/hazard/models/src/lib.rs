#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Coastal hazard taxonomy types, hazard reports, and hotspot definitions.
//!
//! This crate defines the canonical hazard taxonomy shared across the
//! entire ocean-watch system. Remote records are normalized into
//! [`HazardReport`] before anything else looks at them, so every enum here
//! is closed: there is no "other" or "unknown" escape hatch.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The kind of coastal hazard a citizen observed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HazardType {
    /// Tsunami waves or drawback of the sea
    Tsunami,
    /// Storm-driven rise in sea level
    StormSurge,
    /// Unusually high or dangerous waves
    HighWaves,
    /// Inundation of coastal land
    CoastalFlooding,
    /// Tides well outside their predicted range
    AbnormalTides,
    /// Erosion or damage to coastal structures
    CoastalDamage,
}

impl HazardType {
    /// Returns the human-readable label for this hazard type.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tsunami => "Tsunami",
            Self::StormSurge => "Storm Surge",
            Self::HighWaves => "High Waves",
            Self::CoastalFlooding => "Coastal Flooding",
            Self::AbnormalTides => "Abnormal Tides",
            Self::CoastalDamage => "Coastal Damage",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Tsunami,
            Self::StormSurge,
            Self::HighWaves,
            Self::CoastalFlooding,
            Self::AbnormalTides,
            Self::CoastalDamage,
        ]
    }
}

/// Severity assigned to a hazard report, from lowest to highest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SeverityLevel {
    /// Minor hazard, no immediate danger
    Low,
    /// Noticeable hazard, caution advised
    Medium,
    /// Dangerous conditions
    High,
    /// Life-threatening conditions
    Critical,
}

impl SeverityLevel {
    /// Returns the human-readable label for this severity.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Whether reports at this severity count as alerts (high or critical).
    #[must_use]
    pub const fn is_alert(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }
}

/// Review state of a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum VerificationStatus {
    /// Not reviewed yet
    Pending,
    /// Confirmed by an official
    Verified,
    /// Reviewed but could not be confirmed
    Unverified,
    /// Confirmed to be a false report
    False,
}

impl VerificationStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::Verified, Self::Unverified, Self::False]
    }
}

/// Error returned when a latitude/longitude pair is outside the valid
/// WGS84 range or not a finite number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// The rejected latitude.
    pub latitude: f64,
    /// The rejected longitude.
    pub longitude: f64,
}

impl std::fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate ({}, {}): expected latitude in [-90, 90] and longitude in [-180, 180]",
            self.latitude, self.longitude
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// Checks that a coordinate pair is finite and within WGS84 bounds.
///
/// # Errors
///
/// Returns [`InvalidCoordinateError`] if either component is out of range
/// or `NaN`.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), InvalidCoordinateError> {
    if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
        Ok(())
    } else {
        Err(InvalidCoordinateError {
            latitude,
            longitude,
        })
    }
}

/// One observed hazard event, in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardReport {
    /// Opaque identifier, unique within a store.
    pub id: String,
    /// What was observed.
    pub hazard_type: HazardType,
    /// Free-text description from the reporter.
    pub description: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Attached photo/video URLs, in upload order.
    pub media_urls: Vec<String>,
    /// When the report was created.
    pub timestamp: DateTime<Utc>,
    /// Reporting user ID, or `"anonymous"`.
    pub reported_by: String,
    /// Review state.
    pub verification_status: VerificationStatus,
    /// Assessed severity.
    pub severity: SeverityLevel,
    /// Locale code the report was written in (e.g. `"en"`, `"ta"`).
    pub language: String,
}

/// A geographic cluster of reports, derived from the current report list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// Stable identifier derived from the grid cell.
    pub id: String,
    /// Centroid latitude of the member reports.
    pub latitude: f64,
    /// Centroid longitude of the member reports.
    pub longitude: f64,
    /// Radius in meters covering every member report.
    pub radius: f64,
    /// Number of member reports.
    pub report_count: u64,
    /// Highest severity among member reports.
    pub severity: SeverityLevel,
    /// Hazard types that contributed to this hotspot.
    pub hazard_types: BTreeSet<HazardType>,
    /// Timestamp of the newest member report.
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn hazard_type_wire_names() {
        assert_eq!(HazardType::StormSurge.to_string(), "storm_surge");
        assert_eq!(
            HazardType::from_str("coastal_flooding").unwrap(),
            HazardType::CoastalFlooding
        );
        assert_eq!(HazardType::from_str("TSUNAMI").unwrap(), HazardType::Tsunami);
        assert!(HazardType::from_str("earthquake").is_err());
    }

    #[test]
    fn verification_false_parses() {
        assert_eq!(
            VerificationStatus::from_str("false").unwrap(),
            VerificationStatus::False
        );
        assert_eq!(VerificationStatus::False.as_ref(), "false");
    }

    #[test]
    fn severity_is_ordered() {
        assert!(SeverityLevel::Low < SeverityLevel::Medium);
        assert!(SeverityLevel::High < SeverityLevel::Critical);
        let alerts: Vec<_> = SeverityLevel::all()
            .iter()
            .copied()
            .filter(|s| s.is_alert())
            .collect();
        assert_eq!(alerts, vec![SeverityLevel::High, SeverityLevel::Critical]);
    }

    #[test]
    fn all_lists_every_variant_once() {
        assert_eq!(HazardType::all().len(), 6);
        let unique: BTreeSet<_> = HazardType::all().iter().collect();
        assert_eq!(unique.len(), HazardType::all().len());
        for pair in HazardType::all().windows(2) {
            assert!(pair[0] < pair[1], "all() must follow declaration order");
        }
    }

    #[test]
    fn coordinate_bounds() {
        assert!(validate_coordinates(13.05, 80.25).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(validate_coordinates(90.5, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.1).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = HazardReport {
            id: "r1".to_string(),
            hazard_type: HazardType::HighWaves,
            description: "Waves over the sea wall".to_string(),
            latitude: 13.05,
            longitude: 80.28,
            media_urls: vec![],
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            reported_by: "anonymous".to_string(),
            verification_status: VerificationStatus::Pending,
            severity: SeverityLevel::Medium,
            language: "en".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["hazardType"], "high_waves");
        assert_eq!(json["verificationStatus"], "pending");
        assert_eq!(json["reportedBy"], "anonymous");
    }
}
