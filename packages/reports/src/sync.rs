//! Keeps a [`ReportStore`] in step with a [`RemoteStore`].
//!
//! Starting an adapter opens the remote change feed first and then runs the
//! bulk fetch. Change events that arrive while the fetch is in flight are
//! buffered and replayed, in arrival order, right after the store is
//! initialized. From then on each event is normalized and applied as it
//! arrives. The fetched rows also seed the feed's baseline, so feeds that
//! diff successive reads pick up from exactly what the store was given.
//!
//! The feed handler only holds a weak reference to the store and checks a
//! released flag before touching it, so events that straggle in after
//! [`SyncAdapter::release`] are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use ocean_watch_hazard_models::HazardReport;
use ocean_watch_source::normalize::{normalize_all, normalize_record};
use ocean_watch_source::{ChangeHandler, FeedSubscription, RemoteStore, SourceError};
use ocean_watch_source_models::{ChangeEvent, RawHazardRecord};

use crate::store::ReportStore;

/// Errors that end a sync attempt.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The remote could not be read or subscribed to.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Shared handle to a store guarded for concurrent event delivery.
pub type SharedStore = Arc<Mutex<ReportStore>>;

pub(crate) fn lock_store(store: &Mutex<ReportStore>) -> MutexGuard<'_, ReportStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Phase {
    /// Initial fetch still running; events wait here.
    Buffering(Vec<ChangeEvent>),
    Live,
}

struct FeedHandler {
    store: Weak<Mutex<ReportStore>>,
    phase: Mutex<Phase>,
    released: AtomicBool,
}

impl FeedHandler {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.released.store(true, Ordering::Release);
        if let Phase::Buffering(pending) = &mut *self.phase() {
            if !pending.is_empty() {
                log::debug!("sync: discarding {} buffered event(s)", pending.len());
            }
            pending.clear();
        }
    }

    fn handle(&self, event: ChangeEvent) {
        if self.is_released() {
            log::debug!(
                "sync: ignoring {} for {:?} after release",
                event.kind(),
                event.record_id()
            );
            return;
        }

        let mut phase = self.phase();
        match &mut *phase {
            Phase::Buffering(pending) => pending.push(event),
            Phase::Live => self.apply(event),
        }
    }

    /// Initializes the store and replays buffered events.
    ///
    /// Holds the phase lock throughout so a concurrently delivered event
    /// waits until the replay is done.
    fn go_live(&self, reports: Vec<HazardReport>) {
        let mut phase = self.phase();
        let pending = match std::mem::replace(&mut *phase, Phase::Live) {
            Phase::Buffering(pending) => pending,
            Phase::Live => Vec::new(),
        };

        if let Some(store) = self.store.upgrade() {
            lock_store(&store).initialize(reports);
        }

        if !pending.is_empty() {
            log::debug!("sync: replaying {} buffered event(s)", pending.len());
        }
        for event in pending {
            self.apply(event);
        }
    }

    fn apply(&self, event: ChangeEvent) {
        if self.is_released() {
            return;
        }
        let Some(store) = self.store.upgrade() else {
            return;
        };

        match event {
            ChangeEvent::Insert { record } => match normalize_record(&record) {
                Ok(report) => {
                    lock_store(&store).apply_insert(report);
                }
                Err(e) => warn_malformed("insert", &record, &e),
            },
            ChangeEvent::Update { record } => match normalize_record(&record) {
                Ok(report) => {
                    lock_store(&store).apply_update(report);
                }
                Err(e) => warn_malformed("update", &record, &e),
            },
            ChangeEvent::Delete { id } => {
                lock_store(&store).apply_delete(&id);
            }
        }
    }
}

fn warn_malformed(kind: &str, record: &RawHazardRecord, error: &dyn std::error::Error) {
    log::warn!(
        "sync: dropping malformed {kind} event id={}: {error}",
        record.id.as_deref().unwrap_or("<none>")
    );
}

impl ChangeHandler for FeedHandler {
    fn on_insert(&self, record: RawHazardRecord) {
        self.handle(ChangeEvent::Insert { record });
    }

    fn on_update(&self, record: RawHazardRecord) {
        self.handle(ChangeEvent::Update { record });
    }

    fn on_delete(&self, id: String) {
        self.handle(ChangeEvent::Delete { id });
    }
}

/// A live link between a remote and a local store.
///
/// Dropping the adapter releases it.
pub struct SyncAdapter {
    handler: Arc<FeedHandler>,
    subscription: Option<FeedSubscription>,
    remote_name: String,
}

impl std::fmt::Debug for SyncAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapter")
            .field("remote", &self.remote_name)
            .field("released", &self.handler.is_released())
            .finish_non_exhaustive()
    }
}

impl SyncAdapter {
    /// Subscribes to `remote`, fetches everything, and initializes `store`.
    ///
    /// Malformed rows in the bulk fetch are dropped individually.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Source`] if the subscription or the fetch
    /// fails. The change feed is released before returning in that case.
    pub async fn start(remote: &dyn RemoteStore, store: &SharedStore) -> Result<Self, SyncError> {
        let handler = Arc::new(FeedHandler {
            store: Arc::downgrade(store),
            phase: Mutex::new(Phase::Buffering(Vec::new())),
            released: AtomicBool::new(false),
        });

        let subscription = remote.subscribe_to_changes(handler.clone())?;
        let mut adapter = Self {
            handler,
            subscription: Some(subscription),
            remote_name: remote.name().to_string(),
        };
        log::info!("sync: subscribed to {} change feed", adapter.remote_name);

        let rows = match remote.fetch_all().await {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("sync: initial fetch from {} failed: {e}", adapter.remote_name);
                adapter.release();
                return Err(e.into());
            }
        };

        if let Some(subscription) = &adapter.subscription {
            subscription.seed_baseline(&rows);
        }

        let reports = normalize_all(&rows);
        log::info!(
            "sync: loaded {} report(s) from {}",
            reports.len(),
            adapter.remote_name
        );
        adapter.handler.go_live(reports);

        Ok(adapter)
    }

    /// Whether [`Self::release`] has run.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.handler.is_released()
    }

    /// Stops applying events and closes the change feed.
    ///
    /// The handler is marked released before the feed is torn down, so an
    /// event racing the teardown is ignored. Calling this twice is harmless.
    pub fn release(&mut self) {
        self.handler.release();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            log::info!("sync: released {} change feed", self.remote_name);
        }
    }
}

impl Drop for SyncAdapter {
    fn drop(&mut self) {
        self.release();
    }
}
