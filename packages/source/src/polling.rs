//! Change feed synthesized by polling.
//!
//! For remotes that only offer bulk reads, a background task re-reads the
//! rows on a fixed interval and diffs each read against the previous one.
//! New IDs become inserts, changed rows become updates, and vanished IDs
//! become deletes.
//!
//! The first diff needs a baseline equal to what the consumer loaded. A
//! consumer that ran `fetch_all` hands those rows to
//! [`FeedSubscription::seed_baseline`]; rows changed or removed between that
//! read and the first poll then come out as updates and deletes. Without a
//! seed the first poll only records the baseline and announces nothing.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ocean_watch_source_models::{ChangeEvent, RawHazardRecord};
use tokio::time::MissedTickBehavior;

use crate::{ChangeHandler, FeedSubscription, SourceError};

/// Rows seen by the previous poll, keyed by ID.
#[derive(Debug, Default)]
pub struct PollState {
    known: BTreeMap<String, RawHazardRecord>,
    primed: bool,
}

impl PollState {
    /// Replaces the baseline with `rows` without producing events.
    pub fn prime(&mut self, rows: Vec<RawHazardRecord>) {
        self.known = rows
            .into_iter()
            .filter_map(|record| record.id.clone().map(|id| (id, record)))
            .collect();
        self.primed = true;
    }

    /// Whether a baseline has been recorded.
    #[must_use]
    pub const fn is_primed(&self) -> bool {
        self.primed
    }

    /// Number of rows seen by the previous poll.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether the previous poll saw no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Diffs `current` against the previous poll, remembers `current`, and
    /// returns the events that explain the difference.
    ///
    /// Inserts and updates come first, oldest row first (`current` is
    /// newest first); deletes follow in ID order. Rows without an ID are
    /// ignored.
    pub fn advance(&mut self, current: Vec<RawHazardRecord>) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        let mut next = BTreeMap::new();

        for record in current.into_iter().rev() {
            let Some(id) = record.id.clone() else {
                log::warn!("Polled hazard row without an id, ignoring it");
                continue;
            };

            match self.known.remove(&id) {
                None => events.push(ChangeEvent::Insert {
                    record: record.clone(),
                }),
                Some(previous) if previous != record => events.push(ChangeEvent::Update {
                    record: record.clone(),
                }),
                Some(_) => {}
            }
            next.insert(id, record);
        }

        // Whatever is left in `known` disappeared since the last poll.
        events.extend(
            std::mem::take(&mut self.known)
                .into_keys()
                .map(|id| ChangeEvent::Delete { id }),
        );

        self.known = next;
        self.primed = true;
        events
    }
}

fn lock_state(state: &Mutex<PollState>) -> MutexGuard<'_, PollState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawns a polling change feed on the current tokio runtime.
///
/// `fetch` is called once per `interval` (the first call happens one
/// interval after subscribing). A failed poll is logged and skipped; the
/// baseline is kept so the next successful poll still diffs correctly.
///
/// The returned subscription accepts a baseline through
/// [`FeedSubscription::seed_baseline`], which replaces whatever the feed
/// saw so far.
///
/// # Errors
///
/// Returns [`SourceError::Transport`] if called outside a tokio runtime.
pub fn spawn_polling_feed<F, Fut>(
    fetch: F,
    interval: Duration,
    handler: Arc<dyn ChangeHandler>,
) -> Result<FeedSubscription, SourceError>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<RawHazardRecord>, SourceError>> + Send + 'static,
{
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| SourceError::Transport {
        message: format!("polling feed needs a tokio runtime: {e}"),
    })?;

    let interval = interval.max(Duration::from_millis(1));
    let stopped = Arc::new(AtomicBool::new(false));
    let task_stopped = stopped.clone();
    let state = Arc::new(Mutex::new(PollState::default()));
    let task_state = state.clone();

    let task = runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if task_stopped.load(Ordering::Acquire) {
                break;
            }

            match fetch().await {
                Ok(rows) => {
                    let events = {
                        let mut state = lock_state(&task_state);
                        if state.is_primed() {
                            state.advance(rows)
                        } else {
                            log::debug!("Unseeded poll recorded {} row(s) as baseline", rows.len());
                            state.prime(rows);
                            Vec::new()
                        }
                    };
                    if !events.is_empty() {
                        log::debug!("Poll produced {} change event(s)", events.len());
                    }
                    for event in events {
                        if task_stopped.load(Ordering::Acquire) {
                            return;
                        }
                        handler.on_event(event);
                    }
                }
                Err(e) => log::warn!("Change poll failed, trying again next tick: {e}"),
            }
        }
    });

    log::info!("Polling change feed started (every {interval:?})");

    Ok(FeedSubscription::new(move || {
        stopped.store(true, Ordering::Release);
        task.abort();
        log::info!("Polling change feed stopped");
    })
    .with_baseline(move |rows| {
        lock_state(&state).prime(rows.to_vec());
        log::debug!("Polling baseline seeded with {} row(s)", rows.len());
    }))
}

#[cfg(test)]
mod tests {
    use std::future::Ready;

    use ocean_watch_source_models::ChangeKind;

    use super::*;

    fn raw(id: &str, severity: &str) -> RawHazardRecord {
        RawHazardRecord {
            id: Some(id.to_string()),
            severity: Some(severity.to_string()),
            ..RawHazardRecord::default()
        }
    }

    fn summarize(events: &[ChangeEvent]) -> Vec<(ChangeKind, String)> {
        events
            .iter()
            .map(|e| (e.kind(), e.record_id().unwrap_or_default().to_string()))
            .collect()
    }

    #[test]
    fn diff_against_empty_baseline_is_all_inserts() {
        let mut state = PollState::default();
        let events = state.advance(vec![raw("b", "low"), raw("a", "low")]);
        assert_eq!(
            summarize(&events),
            vec![
                (ChangeKind::Insert, "a".to_string()),
                (ChangeKind::Insert, "b".to_string()),
            ]
        );
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn detects_updates_and_deletes() {
        let mut state = PollState::default();
        state.advance(vec![raw("c", "low"), raw("b", "low"), raw("a", "low")]);

        let events = state.advance(vec![raw("d", "low"), raw("b", "critical"), raw("a", "low")]);
        assert_eq!(
            summarize(&events),
            vec![
                (ChangeKind::Update, "b".to_string()),
                (ChangeKind::Insert, "d".to_string()),
                (ChangeKind::Delete, "c".to_string()),
            ]
        );
    }

    #[test]
    fn unchanged_poll_is_silent() {
        let mut state = PollState::default();
        state.advance(vec![raw("a", "low")]);
        assert!(state.advance(vec![raw("a", "low")]).is_empty());
    }

    #[test]
    fn rows_without_ids_are_ignored() {
        let mut state = PollState::default();
        let events = state.advance(vec![RawHazardRecord::default()]);
        assert!(events.is_empty());
        assert!(state.is_empty());
    }

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<(ChangeKind, String)>>,
    }

    impl ChangeHandler for Collect {
        fn on_insert(&self, record: RawHazardRecord) {
            self.events
                .lock()
                .unwrap()
                .push((ChangeKind::Insert, record.id.unwrap_or_default()));
        }

        fn on_update(&self, record: RawHazardRecord) {
            self.events
                .lock()
                .unwrap()
                .push((ChangeKind::Update, record.id.unwrap_or_default()));
        }

        fn on_delete(&self, id: String) {
            self.events.lock().unwrap().push((ChangeKind::Delete, id));
        }
    }

    #[test]
    fn primed_baseline_turns_later_changes_into_updates_and_deletes() {
        let mut state = PollState::default();
        assert!(!state.is_primed());
        state.prime(vec![raw("b", "low"), raw("a", "low"), RawHazardRecord::default()]);
        assert!(state.is_primed());
        assert_eq!(state.len(), 2);

        let events = state.advance(vec![raw("a", "critical")]);
        assert_eq!(
            summarize(&events),
            vec![
                (ChangeKind::Update, "a".to_string()),
                (ChangeKind::Delete, "b".to_string()),
            ]
        );
    }

    type Polled = Result<Vec<RawHazardRecord>, SourceError>;

    /// Serves queued poll results, then a fixed final read.
    fn scripted_fetch(
        script: Vec<Polled>,
        last: Vec<RawHazardRecord>,
    ) -> impl Send + 'static + Fn() -> Ready<Polled> {
        let queue = Arc::new(Mutex::new(script));
        move || {
            let mut queue = queue.lock().unwrap();
            let next = if queue.is_empty() {
                Ok(last.clone())
            } else {
                queue.remove(0)
            };
            std::future::ready(next)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unseeded_feed_records_first_poll_silently() {
        let fetch = scripted_fetch(
            vec![
                Ok(vec![raw("a", "low")]),
                Err(SourceError::Transport {
                    message: "flaky".to_string(),
                }),
                Ok(vec![raw("a", "high")]),
            ],
            vec![raw("b", "low"), raw("a", "high")],
        );

        let collect = Arc::new(Collect::default());
        let sub = spawn_polling_feed(fetch, Duration::from_secs(5), collect.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(21)).await;
        sub.unsubscribe();
        let seen = collect.events.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (ChangeKind::Update, "a".to_string()),
                (ChangeKind::Insert, "b".to_string()),
            ]
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(collect.events.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_baseline_reports_changes_made_before_first_poll() {
        let fetch = scripted_fetch(Vec::new(), vec![raw("a", "critical")]);
        let collect = Arc::new(Collect::default());
        let sub = spawn_polling_feed(fetch, Duration::from_secs(5), collect.clone()).unwrap();

        sub.seed_baseline(&[raw("b", "low"), raw("a", "low")]);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(
            *collect.events.lock().unwrap(),
            vec![
                (ChangeKind::Update, "a".to_string()),
                (ChangeKind::Delete, "b".to_string()),
            ]
        );
    }

    #[test]
    fn requires_runtime() {
        let fetch = || async { Ok(Vec::new()) };
        let result = spawn_polling_feed(fetch, Duration::from_secs(1), Arc::new(Collect::default()));
        assert!(matches!(result, Err(SourceError::Transport { .. })));
    }
}
