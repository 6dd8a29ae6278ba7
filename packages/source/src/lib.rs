#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Remote hazard store contract, record normalization, and transports.
//!
//! Every backend implements the [`RemoteStore`] trait: a one-shot bulk
//! read plus a long-lived change feed. Raw rows coming out of either path
//! are turned into canonical reports by [`normalize`].

pub mod json_file;
pub mod memory;
pub mod normalize;
pub mod parsing;
pub mod polling;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use ocean_watch_source_models::{ChangeEvent, RawHazardRecord};

/// Errors that can occur while talking to a remote store.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote answered with a non-success status code.
    #[error("Remote returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },

    /// The transport could not deliver or set up a channel.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of what went wrong.
        message: String,
    },
}

/// Receives events from a remote change feed.
///
/// Handlers are invoked from whatever task or thread the transport
/// delivers on, so implementations must be `Send + Sync`.
pub trait ChangeHandler: Send + Sync {
    /// A row was created remotely.
    fn on_insert(&self, record: RawHazardRecord);

    /// A row was modified remotely.
    fn on_update(&self, record: RawHazardRecord);

    /// A row was removed remotely.
    fn on_delete(&self, id: String);

    /// Routes a [`ChangeEvent`] to the matching callback.
    fn on_event(&self, event: ChangeEvent) {
        match event {
            ChangeEvent::Insert { record } => self.on_insert(record),
            ChangeEvent::Update { record } => self.on_update(record),
            ChangeEvent::Delete { id } => self.on_delete(id),
        }
    }
}

/// Handle to an open change-feed subscription.
///
/// The channel is released exactly once: either explicitly through
/// [`FeedSubscription::unsubscribe`] or when the handle is dropped.
///
/// Feeds that derive events by diffing reads can attach a baseline hook
/// with [`FeedSubscription::with_baseline`]. The consumer passes the rows
/// of its bulk read to [`FeedSubscription::seed_baseline`] so the feed's
/// next diff starts from exactly what the consumer loaded.
pub struct FeedSubscription {
    release: Option<Box<dyn FnOnce() + Send>>,
    baseline: Option<Box<dyn Fn(&[RawHazardRecord]) + Send + Sync>>,
}

impl FeedSubscription {
    /// Creates a subscription that runs `release` when torn down.
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
            baseline: None,
        }
    }

    /// Creates a subscription with nothing to release (for feeds that never
    /// deliver events).
    #[must_use]
    pub const fn noop() -> Self {
        Self {
            release: None,
            baseline: None,
        }
    }

    /// Attaches a hook that resets the feed's baseline to a bulk read.
    #[must_use]
    pub fn with_baseline(
        mut self,
        seed: impl Fn(&[RawHazardRecord]) + Send + Sync + 'static,
    ) -> Self {
        self.baseline = Some(Box::new(seed));
        self
    }

    /// Tells the feed which rows the consumer loaded. A no-op for push
    /// feeds.
    pub fn seed_baseline(&self, rows: &[RawHazardRecord]) {
        if let Some(seed) = &self.baseline {
            seed(rows);
        }
    }

    /// Releases the channel now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("active", &self.release.is_some())
            .field("diffs_against_baseline", &self.baseline.is_some())
            .finish()
    }
}

/// Trait that every remote hazard store must implement.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns a short identifier for logging (e.g. `"rest"`, `"memory"`).
    fn name(&self) -> &str;

    /// Reads every report row, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the read cannot be completed.
    async fn fetch_all(&self) -> Result<Vec<RawHazardRecord>, SourceError>;

    /// Opens the change feed, delivering events to `handler` until the
    /// returned subscription is released.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the channel cannot be opened.
    fn subscribe_to_changes(
        &self,
        handler: Arc<dyn ChangeHandler>,
    ) -> Result<FeedSubscription, SourceError>;
}
