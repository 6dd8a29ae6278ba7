//! Human-readable rendering of aggregate snapshots.

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};
use ocean_watch_analytics::queries::{critical_reports, format_trend, recent, time_ago};
use ocean_watch_analytics_models::AggregateSnapshot;
use ocean_watch_hazard_models::{HazardReport, HazardType, SeverityLevel};

/// Number of reports listed under "Recent reports".
const RECENT_LIMIT: usize = 5;

/// One-line summary used when logging a stream of snapshots.
#[must_use]
pub fn summary_line(snapshot: &AggregateSnapshot) -> String {
    format!(
        "{} reports, {} this week ({} vs last week), {} alerts, {} hotspots, top: {}",
        snapshot.total_reports,
        snapshot.this_week,
        format_trend(snapshot.trend, &snapshot.trend_percentage),
        snapshot.critical_alert_count,
        snapshot.hotspot_count,
        snapshot.top_hazard.map_or("none", HazardType::label),
    )
}

#[allow(clippy::cast_possible_truncation)]
fn bar(count: u64, max: u64) -> String {
    const WIDTH: u64 = 20;
    if max == 0 {
        return String::new();
    }
    "#".repeat((count * WIDTH).div_ceil(max) as usize)
}

/// Full multi-section report of a snapshot.
#[must_use]
pub fn render_text<Tz: TimeZone>(
    snapshot: &AggregateSnapshot,
    reports: &[HazardReport],
    now: &DateTime<Tz>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Coastal hazard summary");
    let _ = writeln!(out, "{}", "=".repeat(40));
    let _ = writeln!(out, "Total reports:     {}", snapshot.total_reports);
    let _ = writeln!(out, "Last 24 hours:     {}", snapshot.last_24_hours);
    let _ = writeln!(
        out,
        "This week:         {} ({} vs last week's {})",
        snapshot.this_week,
        format_trend(snapshot.trend, &snapshot.trend_percentage),
        snapshot.last_week
    );
    let _ = writeln!(out, "Critical alerts:   {}", snapshot.critical_alert_count);
    let _ = writeln!(out, "Hotspots:          {}", snapshot.hotspot_count);
    let _ = writeln!(
        out,
        "Top hazard:        {}",
        snapshot.top_hazard.map_or("none", HazardType::label)
    );

    let max = snapshot.hazard_counts.values().copied().max().unwrap_or(0);
    let _ = writeln!(out, "\nBy hazard type");
    for (hazard_type, count) in &snapshot.hazard_counts {
        let _ = writeln!(
            out,
            "  {:<18} {:>4} {}",
            hazard_type.label(),
            count,
            bar(*count, max)
        );
    }

    let _ = writeln!(out, "\nBy severity");
    for severity in SeverityLevel::all() {
        let _ = writeln!(
            out,
            "  {:<18} {:>4}",
            severity.label(),
            snapshot.severity_count(*severity)
        );
    }

    let _ = writeln!(out, "\nLast 7 days");
    for day in &snapshot.daily {
        let _ = writeln!(
            out,
            "  {} {}  {:>4} reports  {:>4} critical",
            day.label, day.date, day.reports, day.critical
        );
    }

    if !snapshot.hotspots.is_empty() {
        let _ = writeln!(out, "\nHotspots");
        for hotspot in &snapshot.hotspots {
            let _ = writeln!(
                out,
                "  {:.2}, {:.2}  {} reports, {} severity, radius {:.0} m",
                hotspot.latitude,
                hotspot.longitude,
                hotspot.report_count,
                hotspot.severity.label(),
                hotspot.radius
            );
        }
    }

    let alerts = critical_reports(reports);
    if !alerts.is_empty() {
        let _ = writeln!(out, "\nActive alerts");
        for report in alerts.iter().take(RECENT_LIMIT) {
            let _ = writeln!(
                out,
                "  [{}] {} at {:.2}, {:.2} ({})",
                report.severity.label(),
                report.hazard_type.label(),
                report.latitude,
                report.longitude,
                time_ago(report.timestamp, now)
            );
        }
    }

    let latest = recent(reports, RECENT_LIMIT);
    if !latest.is_empty() {
        let _ = writeln!(out, "\nRecent reports");
        for report in latest {
            let _ = writeln!(
                out,
                "  {:<10} {:<18} {:<8} {}",
                time_ago(report.timestamp, now),
                report.hazard_type.label(),
                report.severity.label(),
                report.description
            );
        }
    }

    out
}
