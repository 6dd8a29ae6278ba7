//! Small read-only helpers over report lists and aggregate values.

use chrono::{DateTime, TimeZone, Utc};
use ocean_watch_hazard_models::{HazardReport, HazardType};

/// Reports whose type is in `types`, in their original order.
///
/// An empty `types` filter passes every report.
#[must_use]
pub fn filter_by_types<'a>(reports: &'a [HazardReport], types: &[HazardType]) -> Vec<&'a HazardReport> {
    reports
        .iter()
        .filter(|r| types.is_empty() || types.contains(&r.hazard_type))
        .collect()
}

/// Reports with an alert severity (`high` or `critical`), in order.
#[must_use]
pub fn critical_reports(reports: &[HazardReport]) -> Vec<&HazardReport> {
    reports.iter().filter(|r| r.severity.is_alert()).collect()
}

/// The first `n` reports (newest first when the slice comes from a store).
#[must_use]
pub fn recent(reports: &[HazardReport], n: usize) -> &[HazardReport] {
    &reports[..n.min(reports.len())]
}

/// Relative age of `timestamp` as seen from `now`, e.g. `"5m ago"`.
///
/// Timestamps in the future read as `"0m ago"`.
#[must_use]
pub fn time_ago<Tz: TimeZone>(timestamp: DateTime<Utc>, now: &DateTime<Tz>) -> String {
    let minutes = (now.with_timezone(&Utc) - timestamp).num_minutes().max(0);
    if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}

/// Display form of a weekly trend, e.g. `"+25%"` or `"-10%"`.
///
/// `percentage` is the aggregate's `trend_percentage`, which already
/// carries a sign when negative (and for the `"+100"` fallback).
#[must_use]
pub fn format_trend(trend: i64, percentage: &str) -> String {
    if percentage.starts_with(['+', '-']) || trend < 0 {
        format!("{percentage}%")
    } else {
        format!("+{percentage}%")
    }
}
