//! Snapshot aggregation over a report list.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use ocean_watch_analytics_models::{AggregateSnapshot, DAILY_BUCKETS, DailyPoint, HazardCount};
use ocean_watch_hazard_models::{HazardReport, HazardType, SeverityLevel, VerificationStatus};

use crate::hotspots::build_hotspots;

fn zeroed<K: Ord + Copy>(keys: &[K]) -> BTreeMap<K, u64> {
    keys.iter().map(|k| (*k, 0)).collect()
}

fn bump<K: Ord>(counts: &mut BTreeMap<K, u64>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

/// Percentage change of `this_week` over `last_week`, as a string.
///
/// Rounded to a whole number when last week had reports. Otherwise
/// `"+100"` if this week has any and `"0"` if neither does.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn trend_percentage(this_week: u64, last_week: u64) -> String {
    if last_week > 0 {
        let change = (this_week as f64 - last_week as f64) / last_week as f64 * 100.0;
        format!("{}", change.round() as i64)
    } else if this_week > 0 {
        "+100".to_string()
    } else {
        "0".to_string()
    }
}

fn rank_hazards(counts: &BTreeMap<HazardType, u64>) -> Vec<HazardCount> {
    let mut ranked: Vec<HazardCount> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(hazard_type, count)| HazardCount {
            hazard_type: *hazard_type,
            count: *count,
        })
        .collect();
    // Stable, so equal counts keep declaration order.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

fn daily_series<Tz: TimeZone>(reports: &[HazardReport], now: &DateTime<Tz>) -> Vec<DailyPoint> {
    let zone = now.timezone();
    let today = now.date_naive();
    let days: Vec<NaiveDate> = (0..DAILY_BUCKETS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back as u64)))
        .collect();

    let mut buckets: BTreeMap<NaiveDate, (u64, u64)> =
        days.iter().map(|day| (*day, (0, 0))).collect();

    for report in reports {
        let day = report.timestamp.with_timezone(&zone).date_naive();
        if let Some((total, critical)) = buckets.get_mut(&day) {
            *total += 1;
            if report.severity.is_alert() {
                *critical += 1;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(date, (reports, critical))| DailyPoint {
            date,
            label: date.format("%a").to_string(),
            reports,
            critical,
        })
        .collect()
}

/// Derives every dashboard statistic from `reports` as of `now`.
///
/// The zone of `now` decides where calendar days begin for the daily
/// series; the weekly and 24-hour windows are plain durations back from
/// `now`. Never fails, and returns a fully zeroed snapshot (with seven
/// empty days) for an empty slice.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn aggregate<Tz: TimeZone>(reports: &[HazardReport], now: &DateTime<Tz>) -> AggregateSnapshot {
    let now_utc: DateTime<Utc> = now.with_timezone(&Utc);
    let day_ago = now_utc - Duration::hours(24);
    let week_ago = now_utc - Duration::days(7);
    let two_weeks_ago = now_utc - Duration::days(14);

    let mut hazard_counts = zeroed(HazardType::all());
    let mut severity_counts = zeroed(SeverityLevel::all());
    let mut verification_counts = zeroed(VerificationStatus::all());
    let mut this_week = 0u64;
    let mut last_week = 0u64;
    let mut last_24_hours = 0u64;
    let mut critical_alert_count = 0u64;

    for report in reports {
        bump(&mut hazard_counts, report.hazard_type);
        bump(&mut severity_counts, report.severity);
        bump(&mut verification_counts, report.verification_status);

        if report.timestamp >= week_ago {
            this_week += 1;
        } else if report.timestamp >= two_weeks_ago {
            last_week += 1;
        }
        if report.timestamp >= day_ago {
            last_24_hours += 1;
        }
        if report.severity.is_alert() {
            critical_alert_count += 1;
        }
    }

    let ranked_hazards = rank_hazards(&hazard_counts);
    let hotspots = build_hotspots(reports);

    AggregateSnapshot {
        total_reports: reports.len() as u64,
        top_hazard: ranked_hazards.first().map(|h| h.hazard_type),
        ranked_hazards,
        hazard_counts,
        severity_counts,
        verification_counts,
        this_week,
        last_week,
        trend: this_week as i64 - last_week as i64,
        trend_percentage: trend_percentage(this_week, last_week),
        critical_alert_count,
        last_24_hours,
        hotspot_count: hotspots.len() as u64,
        hotspots,
        daily: daily_series(reports, now),
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn report(
        id: &str,
        hazard_type: HazardType,
        severity: SeverityLevel,
        timestamp: DateTime<Utc>,
    ) -> HazardReport {
        HazardReport {
            id: id.to_string(),
            hazard_type,
            description: String::new(),
            latitude: 13.0,
            longitude: 80.0,
            media_urls: Vec::new(),
            timestamp,
            reported_by: "anonymous".to_string(),
            verification_status: VerificationStatus::Pending,
            severity,
            language: "en".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_input_is_fully_zeroed() {
        let snapshot = aggregate(&[], &now());
        assert_eq!(snapshot.total_reports, 0);
        assert_eq!(snapshot.hazard_counts.len(), HazardType::all().len());
        assert!(snapshot.hazard_counts.values().all(|c| *c == 0));
        assert_eq!(snapshot.severity_counts.len(), 4);
        assert_eq!(snapshot.verification_counts.len(), 4);
        assert_eq!(snapshot.top_hazard, None);
        assert!(snapshot.ranked_hazards.is_empty());
        assert_eq!(snapshot.trend, 0);
        assert_eq!(snapshot.trend_percentage, "0");
        assert_eq!(snapshot.hotspot_count, 0);
        assert_eq!(snapshot.daily.len(), DAILY_BUCKETS);
        assert!(snapshot.daily.iter().all(|d| d.reports == 0 && d.critical == 0));
    }

    #[test]
    fn ten_day_old_report_counts_toward_last_week() {
        let reports = vec![
            report("today", HazardType::HighWaves, SeverityLevel::High, now() - Duration::hours(1)),
            report("old", HazardType::Tsunami, SeverityLevel::Low, now() - Duration::days(10)),
        ];
        let snapshot = aggregate(&reports, &now());
        assert_eq!(snapshot.this_week, 1);
        assert_eq!(snapshot.last_week, 1);
        assert_eq!(snapshot.trend, 0);
        assert_eq!(snapshot.trend_percentage, "0");
        assert_eq!(snapshot.critical_alert_count, 1);
    }

    #[test]
    fn new_week_over_empty_week_is_plus_one_hundred() {
        let reports = vec![
            report("today", HazardType::HighWaves, SeverityLevel::High, now() - Duration::hours(1)),
            report("old", HazardType::Tsunami, SeverityLevel::Low, now() - Duration::days(20)),
        ];
        let snapshot = aggregate(&reports, &now());
        assert_eq!(snapshot.this_week, 1);
        assert_eq!(snapshot.last_week, 0);
        assert_eq!(snapshot.trend, 1);
        assert_eq!(snapshot.trend_percentage, "+100");
        assert_eq!(snapshot.critical_alert_count, 1);
        assert_eq!(snapshot.last_24_hours, 1);
    }

    #[test]
    fn percentage_is_rounded_and_signed_only_when_negative() {
        assert_eq!(trend_percentage(5, 4), "25");
        assert_eq!(trend_percentage(2, 3), "-33");
        assert_eq!(trend_percentage(0, 2), "-100");
        assert_eq!(trend_percentage(3, 0), "+100");
        assert_eq!(trend_percentage(0, 0), "0");
        assert_eq!(trend_percentage(4, 4), "0");
    }

    #[test]
    fn week_boundaries_are_half_open() {
        let reports = vec![
            report("edge_this", HazardType::Tsunami, SeverityLevel::Low, now() - Duration::days(7)),
            report("edge_last", HazardType::Tsunami, SeverityLevel::Low, now() - Duration::days(14)),
            report("too_old", HazardType::Tsunami, SeverityLevel::Low, now() - Duration::days(15)),
        ];
        let snapshot = aggregate(&reports, &now());
        assert_eq!(snapshot.this_week, 1);
        assert_eq!(snapshot.last_week, 1);
        assert_eq!(snapshot.trend_percentage, "0");
    }

    #[test]
    fn histograms_sum_to_total() {
        let reports: Vec<_> = (0..9)
            .map(|i| {
                report(
                    &format!("r{i}"),
                    HazardType::all()[i % HazardType::all().len()],
                    SeverityLevel::all()[i % SeverityLevel::all().len()],
                    now() - Duration::days(i64::try_from(i).unwrap()),
                )
            })
            .collect();
        let snapshot = aggregate(&reports, &now());
        assert_eq!(snapshot.hazard_counts.values().sum::<u64>(), 9);
        assert_eq!(snapshot.severity_counts.values().sum::<u64>(), 9);
        assert_eq!(snapshot.verification_counts.values().sum::<u64>(), 9);
        assert_eq!(snapshot, aggregate(&reports, &now()));
    }

    #[test]
    fn top_hazard_ties_go_to_declaration_order() {
        let reports = vec![
            report("a", HazardType::CoastalDamage, SeverityLevel::Low, now()),
            report("b", HazardType::StormSurge, SeverityLevel::Low, now()),
            report("c", HazardType::CoastalDamage, SeverityLevel::Low, now()),
            report("d", HazardType::StormSurge, SeverityLevel::Low, now()),
            report("e", HazardType::Tsunami, SeverityLevel::Low, now()),
        ];
        let snapshot = aggregate(&reports, &now());
        assert_eq!(snapshot.top_hazard, Some(HazardType::StormSurge));
        assert_eq!(
            snapshot.ranked_hazards,
            vec![
                HazardCount { hazard_type: HazardType::StormSurge, count: 2 },
                HazardCount { hazard_type: HazardType::CoastalDamage, count: 2 },
                HazardCount { hazard_type: HazardType::Tsunami, count: 1 },
            ]
        );
    }

    #[test]
    fn daily_series_uses_local_days() {
        // 2025-06-15 03:00 at UTC+05:30 is 2025-06-14 21:30 UTC.
        let zone = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let local_now = zone.with_ymd_and_hms(2025, 6, 15, 3, 0, 0).unwrap();
        let reports = vec![
            // 00:30 local today.
            report("a", HazardType::Tsunami, SeverityLevel::Critical,
                Utc.with_ymd_and_hms(2025, 6, 14, 19, 0, 0).unwrap()),
            // 23:30 local yesterday.
            report("b", HazardType::Tsunami, SeverityLevel::Low,
                Utc.with_ymd_and_hms(2025, 6, 14, 18, 0, 0).unwrap()),
            // Eight local days ago, outside the series.
            report("c", HazardType::Tsunami, SeverityLevel::Low,
                Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap()),
        ];

        let daily = aggregate(&reports, &local_now).daily;
        assert_eq!(daily.len(), 7);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        assert_eq!(daily[6].date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert_eq!(daily[6].label, "Sun");
        assert_eq!((daily[6].reports, daily[6].critical), (1, 1));
        assert_eq!((daily[5].reports, daily[5].critical), (1, 0));
        assert_eq!(daily.iter().map(|d| d.reports).sum::<u64>(), 2);
    }

    #[test]
    fn clustered_reports_form_one_hotspot() {
        let mut a = report("a", HazardType::HighWaves, SeverityLevel::Low, now());
        (a.latitude, a.longitude) = (13.05, 80.25);
        let mut b = report("b", HazardType::HighWaves, SeverityLevel::Low, now());
        (b.latitude, b.longitude) = (13.04, 80.26);
        let mut c = report("c", HazardType::HighWaves, SeverityLevel::Low, now());
        (c.latitude, c.longitude) = (8.5, 76.9);

        let snapshot = aggregate(&[a, b, c], &now());
        assert_eq!(snapshot.hotspot_count, 1);
        assert_eq!(snapshot.hotspots[0].report_count, 2);
    }
}
