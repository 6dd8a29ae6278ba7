//! In-memory report store.
//!
//! Holds the current report list ordered newest first and tells its
//! listeners whenever that list actually changes.

use std::collections::BTreeSet;

use ocean_watch_hazard_models::HazardReport;

/// Handle returned by [`ReportStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&[HazardReport]) + Send>;

/// Ordered collection of hazard reports with change notification.
///
/// Reports are kept in `timestamp` descending order and IDs are unique.
/// Listeners run synchronously after each committed change, in the order
/// they were registered, and receive the full current list.
#[derive(Default)]
pub struct ReportStore {
    reports: Vec<HazardReport>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl std::fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStore")
            .field("reports", &self.reports.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole contents with `records`.
    ///
    /// The records are sorted newest first (stable, so equal timestamps keep
    /// their input order) and repeated IDs keep only their first occurrence.
    pub fn initialize(&mut self, records: Vec<HazardReport>) {
        let mut seen = BTreeSet::new();
        let mut reports: Vec<HazardReport> = records
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        log::debug!("store: initialized with {} report(s)", reports.len());
        if reports != self.reports {
            self.reports = reports;
            self.notify();
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.reports.iter().position(|r| r.id == id)
    }

    fn insert_sorted(&mut self, record: HazardReport) {
        // Ahead of every report with the same or an older timestamp.
        let index = self
            .reports
            .partition_point(|r| r.timestamp > record.timestamp);
        self.reports.insert(index, record);
    }

    /// Inserts `record` in timestamp order.
    ///
    /// Returns `false` (and notifies nobody) if a report with the same ID
    /// is already present.
    pub fn apply_insert(&mut self, record: HazardReport) -> bool {
        if self.position(&record.id).is_some() {
            log::debug!("store: insert of existing id={} ignored", record.id);
            return false;
        }

        log::debug!("store: insert id={}", record.id);
        self.insert_sorted(record);
        self.notify();
        true
    }

    /// Replaces the report with the same ID, keeping its position.
    ///
    /// An unknown ID is inserted as a new report. Returns whether the store
    /// changed.
    pub fn apply_update(&mut self, record: HazardReport) -> bool {
        match self.position(&record.id) {
            Some(index) if self.reports[index] == record => {
                log::debug!("store: update of id={} changed nothing", record.id);
                return false;
            }
            Some(index) => {
                log::debug!("store: update id={}", record.id);
                self.reports[index] = record;
            }
            None => {
                log::debug!("store: update of unknown id={}, inserting", record.id);
                self.insert_sorted(record);
            }
        }
        self.notify();
        true
    }

    /// Removes the report with `id`. Returns `false` if there was none.
    pub fn apply_delete(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            log::debug!("store: delete of unknown id={id} ignored");
            return false;
        };

        log::debug!("store: delete id={id}");
        self.reports.remove(index);
        self.notify();
        true
    }

    /// The current reports, newest first.
    #[must_use]
    pub fn snapshot(&self) -> &[HazardReport] {
        &self.reports
    }

    /// Looks up a report by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HazardReport> {
        self.reports.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Registers `listener` to run after every change.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&[HazardReport]) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.reports);
        }
    }
}
