//! PostgREST-style remote store.
//!
//! Bulk reads go through `GET {base_url}/rest/v1/{table}?select=*&order=created_at.desc`.
//! The change feed is a [polling feed](crate::polling) over the same
//! endpoint, so any backend exposing that REST surface works without a
//! realtime socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ocean_watch_source_models::RawHazardRecord;

use crate::parsing::parse_raw_records;
use crate::polling::spawn_polling_feed;
use crate::{ChangeHandler, FeedSubscription, RemoteStore, SourceError};

/// Maximum length of an error response body kept in [`SourceError::Status`].
const BODY_PREVIEW_LEN: usize = 500;

/// Connection settings for a [`RestRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestSettings {
    /// Project base URL (e.g. `https://abc.supabase.co`).
    pub base_url: String,
    /// Table holding the report rows.
    pub table: String,
    /// API key sent as both `apikey` and bearer token, if set.
    pub api_key: Option<String>,
    /// How often the change feed re-reads the table.
    pub poll_interval: Duration,
}

/// A [`RemoteStore`] that talks to a PostgREST endpoint.
#[derive(Clone)]
pub struct RestRemote {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl RestRemote {
    /// Creates a remote for the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &RestSettings) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ocean-watch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: table_endpoint(&settings.base_url, &settings.table),
            api_key: settings.api_key.clone(),
            poll_interval: settings.poll_interval,
        })
    }

    /// The full table URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_rows(&self) -> Result<Vec<RawHazardRecord>, SourceError> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > BODY_PREVIEW_LEN {
                let mut cut = BODY_PREVIEW_LEN;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        let rows = parse_raw_records(body);
        log::debug!("Fetched {} hazard rows from {}", rows.len(), self.endpoint);
        Ok(rows)
    }
}

fn table_endpoint(base_url: &str, table: &str) -> String {
    format!(
        "{}/rest/v1/{}",
        base_url.trim_end_matches('/'),
        table.trim_matches('/')
    )
}

#[async_trait]
impl RemoteStore for RestRemote {
    fn name(&self) -> &str {
        "rest"
    }

    async fn fetch_all(&self) -> Result<Vec<RawHazardRecord>, SourceError> {
        self.fetch_rows().await
    }

    fn subscribe_to_changes(
        &self,
        handler: Arc<dyn ChangeHandler>,
    ) -> Result<FeedSubscription, SourceError> {
        let remote = self.clone();
        spawn_polling_feed(
            move || {
                let remote = remote.clone();
                async move { remote.fetch_rows().await }
            },
            self.poll_interval,
            handler,
        )
    }
}
