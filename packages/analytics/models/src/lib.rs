#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the aggregation engine.
//!
//! An [`AggregateSnapshot`] is a plain value: it is recomputed from scratch
//! whenever the report list changes and never refers back to the reports it
//! was derived from.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ocean_watch_hazard_models::{HazardType, Hotspot, SeverityLevel, VerificationStatus};
use serde::{Deserialize, Serialize};

/// Number of daily buckets in [`AggregateSnapshot::daily`].
pub const DAILY_BUCKETS: usize = 7;

/// Count of reports of a single hazard type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardCount {
    /// Hazard type.
    pub hazard_type: HazardType,
    /// Number of reports.
    pub count: u64,
}

/// Report counts for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    /// Calendar day in the zone of the aggregation's "now".
    pub date: NaiveDate,
    /// Short weekday label (`Mon` … `Sun`).
    pub label: String,
    /// Reports created that day.
    pub reports: u64,
    /// Reports created that day with an alert severity.
    pub critical: u64,
}

/// Every statistic derived from a report list at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    /// Number of reports aggregated.
    pub total_reports: u64,
    /// Reports per hazard type. Every type is present.
    pub hazard_counts: BTreeMap<HazardType, u64>,
    /// Reports per severity. Every level is present.
    pub severity_counts: BTreeMap<SeverityLevel, u64>,
    /// Reports per verification status. Every status is present.
    pub verification_counts: BTreeMap<VerificationStatus, u64>,
    /// Reports in the trailing 7 days.
    pub this_week: u64,
    /// Reports in the 7 days before that.
    pub last_week: u64,
    /// `this_week - last_week`.
    pub trend: i64,
    /// Whole-number percentage change, as a string (`"+100"` and `"0"`
    /// stand in when last week had no reports).
    pub trend_percentage: String,
    /// Most reported hazard type, if there are any reports.
    pub top_hazard: Option<HazardType>,
    /// Hazard types with at least one report, most reported first.
    pub ranked_hazards: Vec<HazardCount>,
    /// Reports with severity `high` or `critical`.
    pub critical_alert_count: u64,
    /// Reports in the trailing 24 hours.
    pub last_24_hours: u64,
    /// Number of entries in [`Self::hotspots`].
    pub hotspot_count: u64,
    /// Geographic clusters, most affected first.
    pub hotspots: Vec<Hotspot>,
    /// One point per day, oldest first, ending today.
    pub daily: Vec<DailyPoint>,
}

impl AggregateSnapshot {
    /// Count for a single hazard type.
    #[must_use]
    pub fn hazard_count(&self, hazard_type: HazardType) -> u64 {
        self.hazard_counts.get(&hazard_type).copied().unwrap_or(0)
    }

    /// Count for a single severity level.
    #[must_use]
    pub fn severity_count(&self, severity: SeverityLevel) -> u64 {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    /// Count for a single verification status.
    #[must_use]
    pub fn verification_count(&self, status: VerificationStatus) -> u64 {
        self.verification_counts.get(&status).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hazard_counts_serialize_with_wire_names() {
        let snapshot = AggregateSnapshot {
            total_reports: 1,
            hazard_counts: BTreeMap::from([(HazardType::StormSurge, 1)]),
            severity_counts: BTreeMap::new(),
            verification_counts: BTreeMap::new(),
            this_week: 1,
            last_week: 0,
            trend: 1,
            trend_percentage: "+100".to_string(),
            top_hazard: Some(HazardType::StormSurge),
            ranked_hazards: vec![HazardCount {
                hazard_type: HazardType::StormSurge,
                count: 1,
            }],
            critical_alert_count: 0,
            last_24_hours: 1,
            hotspot_count: 0,
            hotspots: Vec::new(),
            daily: Vec::new(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["hazardCounts"]["storm_surge"], 1);
        assert_eq!(json["topHazard"], "storm_surge");
        assert_eq!(json["trendPercentage"], "+100");
        assert_eq!(json["rankedHazards"][0]["hazardType"], "storm_surge");

        assert_eq!(snapshot.hazard_count(HazardType::StormSurge), 1);
        assert_eq!(snapshot.hazard_count(HazardType::Tsunami), 0);
    }
}
