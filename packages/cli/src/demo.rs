//! Scripted walk through the sync lifecycle against an in-memory remote.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ocean_watch_reports::{Clock, HazardReportsView, SyncError, SystemClock, ViewState};
use ocean_watch_source::memory::MemoryRemote;
use ocean_watch_source_models::{ChangeEvent, RawHazardRecord, RawNumber};

use crate::render::summary_line;

fn row(
    id: &str,
    hazard_type: &str,
    severity: &str,
    latitude: f64,
    longitude: f64,
    created_at: DateTime<Utc>,
    description: &str,
) -> RawHazardRecord {
    RawHazardRecord {
        id: Some(id.to_string()),
        hazard_type: Some(hazard_type.to_string()),
        description: Some(description.to_string()),
        latitude: Some(RawNumber::Number(latitude)),
        longitude: Some(RawNumber::Number(longitude)),
        severity: Some(severity.to_string()),
        created_at: Some(created_at.to_rfc3339()),
        ..RawHazardRecord::default()
    }
}

fn seed(now: DateTime<Utc>) -> Vec<RawHazardRecord> {
    vec![
        row("demo-1", "high_waves", "medium", 13.05, 80.25, now - Duration::days(10), "Waves over the breakwater"),
        row("demo-2", "coastal_flooding", "high", 13.04, 80.26, now - Duration::days(3), "Street flooding near the harbour"),
        row("demo-3", "abnormal_tides", "low", 8.52, 76.93, now - Duration::hours(20), "Unusually low tide"),
    ]
}

fn describe(state: &ViewState) -> String {
    match state {
        ViewState::Loading => "loading".to_string(),
        ViewState::Ready { aggregate, .. } => summary_line(aggregate),
        ViewState::Error(message) => format!("error: {message}"),
    }
}

/// Runs the demo, printing the view state after every step.
///
/// # Errors
///
/// Returns [`SyncError`] if mounting the view fails.
pub async fn run() -> Result<(), SyncError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let now = clock.now().with_timezone(&Utc);
    let remote = MemoryRemote::with_records(seed(now));

    let mut view = HazardReportsView::new(clock);
    println!("mount      -> {}", describe(&view.state()));
    view.mount(&remote).await?;
    println!("loaded     -> {}", describe(&view.state()));

    let step = |label: &str, view: &HazardReportsView| {
        println!("{label:<10} -> {}", describe(&view.state()));
    };

    remote.insert(row("demo-4", "tsunami", "critical", 13.08, 80.29, now, "Sea receded rapidly"));
    step("insert", &view);

    let mut escalated = row("demo-3", "abnormal_tides", "high", 8.52, 76.93, now - Duration::hours(20), "Tide still falling");
    escalated.verification_status = Some("verified".to_string());
    remote.update(escalated);
    step("update", &view);

    remote.emit(ChangeEvent::Insert {
        record: row("demo-4", "tsunami", "critical", 13.08, 80.29, now, "Sea receded rapidly"),
    });
    step("duplicate", &view);

    remote.insert(row("demo-5", "sinkhole", "low", 0.0, 0.0, now, "Not a coastal hazard"));
    step("malformed", &view);

    remote.delete("demo-1");
    step("delete", &view);

    view.unmount();
    remote.insert(row("demo-6", "storm_surge", "critical", 13.06, 80.27, now, "Arrived after unmount"));
    step("late", &view);

    Ok(())
}
