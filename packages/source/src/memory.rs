//! In-process remote store.
//!
//! Holds rows in memory and pushes change events to every live subscriber
//! synchronously, on the caller's thread. Used by the demo command and by
//! tests that need to script the exact order in which events arrive.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use ocean_watch_source_models::{ChangeEvent, RawHazardRecord};

use crate::{ChangeHandler, FeedSubscription, RemoteStore, SourceError};

#[derive(Default)]
struct MemoryState {
    /// Rows in insertion order; `fetch_all` returns them newest first.
    rows: Vec<RawHazardRecord>,
    subscribers: BTreeMap<u64, Arc<dyn ChangeHandler>>,
    next_subscriber: u64,
    fetch_failure: Option<String>,
}

/// A [`RemoteStore`] backed by an in-memory row list.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemote {
    /// Creates an empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a remote pre-populated with `rows` (oldest first).
    #[must_use]
    pub fn with_records(rows: Vec<RawHazardRecord>) -> Self {
        let remote = Self::new();
        remote.lock().rows = rows;
        remote
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent `fetch_all` fail with `message`.
    pub fn fail_fetch_with(&self, message: impl Into<String>) {
        self.lock().fetch_failure = Some(message.into());
    }

    /// Number of currently open change-feed subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Adds a row and announces it as an insert.
    pub fn insert(&self, record: RawHazardRecord) {
        self.lock().rows.push(record.clone());
        self.emit(ChangeEvent::Insert { record });
    }

    /// Replaces the row with the same ID (appending it if absent) and
    /// announces it as an update.
    pub fn update(&self, record: RawHazardRecord) {
        {
            let mut state = self.lock();
            match state.rows.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => state.rows.push(record.clone()),
            }
        }
        self.emit(ChangeEvent::Update { record });
    }

    /// Removes the row with `id` and announces the delete.
    pub fn delete(&self, id: &str) {
        self.lock().rows.retain(|r| r.id.as_deref() != Some(id));
        self.emit(ChangeEvent::Delete { id: id.to_string() });
    }

    /// Delivers `event` to every subscriber without touching the stored
    /// rows. Useful for replaying duplicate or out-of-order deliveries.
    pub fn emit(&self, event: ChangeEvent) {
        // Snapshot the subscriber list so handlers run without the lock held.
        let subscribers: Vec<Arc<dyn ChangeHandler>> =
            self.lock().subscribers.values().cloned().collect();

        log::debug!(
            "memory remote: delivering {} for {:?} to {} subscriber(s)",
            event.kind(),
            event.record_id(),
            subscribers.len()
        );

        for subscriber in subscribers {
            subscriber.on_event(event.clone());
        }
    }
}

fn unregister(state: &Weak<Mutex<MemoryState>>, key: u64) {
    if let Some(state) = state.upgrade() {
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .remove(&key);
        log::debug!("memory remote: subscriber {key} released");
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_all(&self) -> Result<Vec<RawHazardRecord>, SourceError> {
        let state = self.lock();
        if let Some(message) = &state.fetch_failure {
            return Err(SourceError::Transport {
                message: message.clone(),
            });
        }
        Ok(state.rows.iter().rev().cloned().collect())
    }

    fn subscribe_to_changes(
        &self,
        handler: Arc<dyn ChangeHandler>,
    ) -> Result<FeedSubscription, SourceError> {
        let key = {
            let mut state = self.lock();
            let key = state.next_subscriber;
            state.next_subscriber += 1;
            state.subscribers.insert(key, handler);
            key
        };
        log::debug!("memory remote: subscriber {key} registered");

        let weak = Arc::downgrade(&self.state);
        Ok(FeedSubscription::new(move || unregister(&weak, key)))
    }
}

#[cfg(test)]
mod tests {
    use ocean_watch_source_models::ChangeKind;

    use super::*;

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<ChangeEvent>>,
    }

    impl ChangeHandler for Collect {
        fn on_insert(&self, record: RawHazardRecord) {
            self.events
                .lock()
                .unwrap()
                .push(ChangeEvent::Insert { record });
        }

        fn on_update(&self, record: RawHazardRecord) {
            self.events
                .lock()
                .unwrap()
                .push(ChangeEvent::Update { record });
        }

        fn on_delete(&self, id: String) {
            self.events.lock().unwrap().push(ChangeEvent::Delete { id });
        }
    }

    fn raw(id: &str) -> RawHazardRecord {
        RawHazardRecord {
            id: Some(id.to_string()),
            ..RawHazardRecord::default()
        }
    }

    #[tokio::test]
    async fn fetch_returns_newest_first() {
        let remote = MemoryRemote::with_records(vec![raw("old"), raw("new")]);
        remote.insert(raw("newest"));
        let ids: Vec<_> = remote
            .fetch_all()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["newest", "new", "old"]);
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let remote = MemoryRemote::new();
        remote.fail_fetch_with("network unreachable");
        let err = remote.fetch_all().await.unwrap_err();
        assert_eq!(err.to_string(), "Transport error: network unreachable");
    }

    #[test]
    fn delivers_until_released() {
        let remote = MemoryRemote::new();
        let collect = Arc::new(Collect::default());
        let sub = remote.subscribe_to_changes(collect.clone()).unwrap();
        assert_eq!(remote.subscriber_count(), 1);

        remote.insert(raw("a"));
        remote.update(raw("a"));
        remote.delete("a");
        sub.unsubscribe();
        remote.insert(raw("b"));

        assert_eq!(remote.subscriber_count(), 0);
        let kinds: Vec<_> = collect
            .events
            .lock()
            .unwrap()
            .iter()
            .map(ChangeEvent::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
        );
    }

    #[test]
    fn release_after_remote_dropped_is_harmless() {
        let remote = MemoryRemote::new();
        let sub = remote
            .subscribe_to_changes(Arc::new(Collect::default()))
            .unwrap();
        drop(remote);
        sub.unsubscribe();
    }
}
