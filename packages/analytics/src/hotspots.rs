//! Grid-cell hotspot detection.
//!
//! Reports are binned into 0.1° × 0.1° cells by flooring their scaled
//! coordinates. Any cell holding at least [`MIN_REPORTS`] reports becomes a
//! [`Hotspot`] centered on the mean of its members.

use std::collections::{BTreeMap, BTreeSet};

use geo::{Distance, Haversine, Point};
use ocean_watch_hazard_models::{HazardReport, Hotspot};

/// Cells per degree along each axis.
const CELLS_PER_DEGREE: f64 = 10.0;

/// Minimum number of reports in a cell for it to count as a hotspot.
pub const MIN_REPORTS: usize = 2;

/// Smallest radius reported for a hotspot, in meters.
pub const MIN_RADIUS_METERS: f64 = 500.0;

/// Index of the grid cell containing a coordinate.
///
/// Cells are floored, not rounded to the nearest tenth: rounding would split
/// `(13.05, 80.25)` and `(13.04, 80.26)` into different cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridCell {
    /// `floor(latitude * 10)`.
    pub lat_idx: i64,
    /// `floor(longitude * 10)`.
    pub lng_idx: i64,
}

impl GridCell {
    /// Cell containing the given coordinate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_idx: (latitude * CELLS_PER_DEGREE).floor() as i64,
            lng_idx: (longitude * CELLS_PER_DEGREE).floor() as i64,
        }
    }

    /// Stable hotspot identifier for this cell.
    #[must_use]
    pub fn hotspot_id(self) -> String {
        format!("hs_{}_{}", self.lat_idx, self.lng_idx)
    }
}

fn group_by_cell(reports: &[HazardReport]) -> BTreeMap<GridCell, Vec<&HazardReport>> {
    let mut cells: BTreeMap<GridCell, Vec<&HazardReport>> = BTreeMap::new();
    for report in reports {
        cells
            .entry(GridCell::containing(report.latitude, report.longitude))
            .or_default()
            .push(report);
    }
    cells
}

/// Number of grid cells holding at least [`MIN_REPORTS`] reports.
#[must_use]
pub fn hotspot_count(reports: &[HazardReport]) -> usize {
    group_by_cell(reports)
        .values()
        .filter(|members| members.len() >= MIN_REPORTS)
        .count()
}

#[allow(clippy::cast_precision_loss)]
fn summarize(cell: GridCell, members: &[&HazardReport]) -> Option<Hotspot> {
    let newest = members.iter().max_by_key(|r| r.timestamp)?;
    let severity = members.iter().map(|r| r.severity).max()?;

    let n = members.len() as f64;
    let latitude = members.iter().map(|r| r.latitude).sum::<f64>() / n;
    let longitude = members.iter().map(|r| r.longitude).sum::<f64>() / n;

    let center = Point::new(longitude, latitude);
    let radius = members
        .iter()
        .map(|r| Haversine.distance(center, Point::new(r.longitude, r.latitude)))
        .fold(MIN_RADIUS_METERS, f64::max);

    Some(Hotspot {
        id: cell.hotspot_id(),
        latitude,
        longitude,
        radius,
        report_count: members.len() as u64,
        severity,
        hazard_types: members.iter().map(|r| r.hazard_type).collect::<BTreeSet<_>>(),
        last_updated: newest.timestamp,
    })
}

/// Builds the hotspot list, most affected first.
///
/// Ordering is report count descending, then severity descending, then ID,
/// so the result is fully determined by the input set.
#[must_use]
pub fn build_hotspots(reports: &[HazardReport]) -> Vec<Hotspot> {
    let mut hotspots: Vec<Hotspot> = group_by_cell(reports)
        .into_iter()
        .filter(|(_, members)| members.len() >= MIN_REPORTS)
        .filter_map(|(cell, members)| summarize(cell, &members))
        .collect();

    hotspots.sort_by(|a, b| {
        b.report_count
            .cmp(&a.report_count)
            .then_with(|| b.severity.cmp(&a.severity))
            .then_with(|| a.id.cmp(&b.id))
    });

    log::trace!(
        "Built {} hotspot(s) from {} report(s)",
        hotspots.len(),
        reports.len()
    );

    hotspots
}
