//! Remote store backed by a JSON export on disk.
//!
//! The file holds a JSON array of raw rows (the same shape the REST
//! endpoint returns). It is read on every `fetch_all`; the change feed
//! never delivers anything.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use ocean_watch_source_models::RawHazardRecord;

use crate::parsing::parse_raw_records;
use crate::{ChangeHandler, FeedSubscription, RemoteStore, SourceError};

/// A read-only [`RemoteStore`] over a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileRemote {
    path: PathBuf,
}

impl JsonFileRemote {
    /// Creates a remote reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this remote reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RemoteStore for JsonFileRemote {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch_all(&self) -> Result<Vec<RawHazardRecord>, SourceError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let body: serde_json::Value = serde_json::from_str(&text)?;
        let rows = parse_raw_records(body);
        log::info!("Read {} hazard rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    fn subscribe_to_changes(
        &self,
        _handler: Arc<dyn ChangeHandler>,
    ) -> Result<FeedSubscription, SourceError> {
        Ok(FeedSubscription::noop())
    }
}
