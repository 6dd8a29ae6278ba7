#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation engine for hazard reports.
//!
//! Every function here is pure: it reads a report slice and an instant
//! and returns freshly computed values. Nothing is cached between calls,
//! so callers recompute on every change to the report list.

pub mod aggregate;
pub mod hotspots;
pub mod queries;

pub use aggregate::aggregate;
pub use hotspots::{build_hotspots, hotspot_count};
