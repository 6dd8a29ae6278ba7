//! Configuration for the `watch` command.
//!
//! Read from a TOML file, then overridden field by field from the
//! environment:
//!
//! ```toml
//! base_url = "https://abc.supabase.co"
//! table = "hazard_reports"
//! api_key = "..."
//! poll_interval_secs = 10
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `OCEAN_WATCH_BASE_URL` | `base_url` |
//! | `OCEAN_WATCH_TABLE` | `table` |
//! | `OCEAN_WATCH_API_KEY` | `api_key` |
//! | `OCEAN_WATCH_POLL_SECS` | `poll_interval_secs` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use ocean_watch_source::rest::RestSettings;
use serde::Deserialize;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "ocean-watch.toml";

const DEFAULT_TABLE: &str = "hazard_reports";
const DEFAULT_POLL_SECS: u64 = 10;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`WatchConfig`].
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// No base URL in the file or the environment.
    #[error("No base_url configured (set it in the config file or OCEAN_WATCH_BASE_URL)")]
    MissingBaseUrl,

    /// A value was present but unusable.
    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue {
        /// Field or variable name.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Settings for watching a REST remote.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Project base URL.
    pub base_url: String,
    /// Table holding report rows.
    pub table: String,
    /// API key, if the endpoint needs one.
    pub api_key: Option<String>,
    /// Seconds between change-feed polls.
    pub poll_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            table: DEFAULT_TABLE.to_string(),
            api_key: None,
            poll_interval_secs: DEFAULT_POLL_SECS,
        }
    }
}

impl WatchConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the config file (if any), applies environment overrides, and
    /// validates the result.
    ///
    /// With no explicit path, [`DEFAULT_CONFIG_FILE`] is used when it
    /// exists; otherwise everything comes from defaults and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or the
    /// merged configuration is incomplete.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        });

        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `lookup` (normally the process environment).
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `OCEAN_WATCH_POLL_SECS` is
    /// not a whole number.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = get("OCEAN_WATCH_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(table) = get("OCEAN_WATCH_TABLE") {
            self.table = table;
        }
        if let Some(api_key) = get("OCEAN_WATCH_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(secs) = get("OCEAN_WATCH_POLL_SECS") {
            self.poll_interval_secs =
                secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "OCEAN_WATCH_POLL_SECS",
                    value: secs.clone(),
                })?;
        }
        Ok(())
    }

    /// Checks that the configuration can be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the base URL or table is empty, or the
    /// poll interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "table",
                value: self.table.clone(),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Connection settings for the REST remote.
    #[must_use]
    pub fn rest_settings(&self) -> RestSettings {
        RestSettings {
            base_url: self.base_url.clone(),
            table: self.table.clone(),
            api_key: self.api_key.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}
