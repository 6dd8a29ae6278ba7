#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live hazard report state.
//!
//! [`store::ReportStore`] holds the ordered report list,
//! [`sync::SyncAdapter`] mirrors a remote into it, and
//! [`view::HazardReportsView`] turns the pair into a `Loading` / `Ready` /
//! `Error` read model with a fresh aggregate on every change.

pub mod clock;
pub mod store;
pub mod sync;
pub mod view;

pub use clock::{Clock, FixedClock, SystemClock};
pub use store::{ListenerId, ReportStore};
pub use sync::{SharedStore, SyncAdapter, SyncError};
pub use view::{HazardReportsView, ViewState};
