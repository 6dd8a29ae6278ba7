//! Reactive read model over a synced report store.
//!
//! A [`HazardReportsView`] owns one store. Mounting it against a remote
//! moves it from [`ViewState::Loading`] to [`ViewState::Ready`] (or to a
//! terminal [`ViewState::Error`]); after that every store change republishes
//! `Ready` with a freshly computed aggregate. Consumers read the state
//! directly or watch it through a [`tokio::sync::watch`] receiver.

use std::sync::{Arc, Mutex};

use ocean_watch_analytics::aggregate;
use ocean_watch_analytics_models::AggregateSnapshot;
use ocean_watch_hazard_models::HazardReport;
use ocean_watch_source::RemoteStore;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::store::{ListenerId, ReportStore};
use crate::sync::{SharedStore, SyncAdapter, SyncError, lock_store};

/// What a consumer of the view sees.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// The initial fetch has not finished.
    Loading,
    /// Reports (newest first) and the statistics derived from them.
    Ready {
        reports: Arc<[HazardReport]>,
        aggregate: Arc<AggregateSnapshot>,
    },
    /// The initial fetch failed. Terminal for this mount.
    Error(String),
}

impl ViewState {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The aggregate, when ready.
    #[must_use]
    pub fn aggregate(&self) -> Option<&AggregateSnapshot> {
        match self {
            Self::Ready { aggregate, .. } => Some(&**aggregate),
            _ => None,
        }
    }

    /// The reports, when ready.
    #[must_use]
    pub fn reports(&self) -> Option<&[HazardReport]> {
        match self {
            Self::Ready { reports, .. } => Some(&**reports),
            _ => None,
        }
    }
}

fn ready(reports: &[HazardReport], clock: &dyn Clock) -> ViewState {
    ViewState::Ready {
        reports: Arc::from(reports),
        aggregate: Arc::new(aggregate(reports, &clock.now())),
    }
}

/// A mountable hazard-report read model.
pub struct HazardReportsView {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<ViewState>>,
    adapter: Option<SyncAdapter>,
    listener: Option<ListenerId>,
}

impl std::fmt::Debug for HazardReportsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HazardReportsView")
            .field("state", &*self.state.borrow())
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

impl HazardReportsView {
    /// Creates an unmounted view in the `Loading` state.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(ViewState::Loading);
        Self {
            store: Arc::new(Mutex::new(ReportStore::new())),
            clock,
            state: Arc::new(state),
            adapter: None,
            listener: None,
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Whether the view is currently attached to a remote.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.adapter.is_some()
    }

    /// Attaches the view to `remote` and loads its reports.
    ///
    /// Any previous mount is released first. On failure the state becomes
    /// [`ViewState::Error`] and stays there until the next mount.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the remote could not be subscribed to or
    /// the initial fetch failed.
    pub async fn mount(&mut self, remote: &dyn RemoteStore) -> Result<(), SyncError> {
        self.unmount();
        self.state.send_replace(ViewState::Loading);
        log::info!("view: mounting against {}", remote.name());

        let adapter = match SyncAdapter::start(remote, &self.store).await {
            Ok(adapter) => adapter,
            Err(e) => {
                self.state.send_replace(ViewState::Error(e.to_string()));
                return Err(e);
            }
        };

        // Register and publish under one lock so no change slips between.
        {
            let mut store = lock_store(&self.store);
            let state = self.state.clone();
            let clock = self.clock.clone();
            self.listener = Some(store.subscribe(move |reports| {
                state.send_replace(ready(reports, clock.as_ref()));
            }));
            self.state
                .send_replace(ready(store.snapshot(), self.clock.as_ref()));
        }
        self.adapter = Some(adapter);

        Ok(())
    }

    /// Detaches from the remote. The last published state is kept.
    pub fn unmount(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.release();
            log::info!("view: unmounted");
        }
        if let Some(listener) = self.listener.take() {
            lock_store(&self.store).unsubscribe(listener);
        }
    }

    /// Recomputes the aggregate against the clock's current time.
    ///
    /// Time-window statistics go stale as time passes even when no report
    /// changes; callers with a long-lived view refresh periodically.
    pub fn refresh(&self) {
        if !self.state.borrow().is_loading() && self.listener.is_some() {
            let store = lock_store(&self.store);
            self.state
                .send_replace(ready(store.snapshot(), self.clock.as_ref()));
        }
    }
}

impl Drop for HazardReportsView {
    fn drop(&mut self) {
        self.unmount();
    }
}
