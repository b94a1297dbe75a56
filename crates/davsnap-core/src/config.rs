//! Configuration types and davsnap.yaml loading
//!
//! Settings come from three layers, highest precedence first:
//! command-line flags (which also read `DAVSNAP_*` environment variables),
//! an optional YAML file, and built-in defaults.

use crate::error::{Error, Result};
use camino::Utf8Path;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Number of snapshots kept when nothing else is configured
pub const DEFAULT_KEEP: usize = 5;

/// Seconds between daemon cycles when nothing else is configured
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Lower bound for the daemon interval
pub const MIN_INTERVAL_SECS: u64 = 60;

/// Timeout for small requests (MKCOL, PROPFIND, DELETE)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for archive uploads and downloads
pub const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 300;

/// Connection settings for the WebDAV store
#[derive(Clone)]
pub struct StoreConfig {
    /// WebDAV endpoint, e.g. `https://dav.example.com/remote.php/dav/files/me`
    pub url: String,

    /// Directory below the endpoint that holds the snapshots
    pub backup_path: String,

    /// Basic auth user
    pub username: String,

    /// Basic auth password
    pub password: String,

    pub request_timeout_secs: u64,

    pub transfer_timeout_secs: u64,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("backup_path", &self.backup_path)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("transfer_timeout_secs", &self.transfer_timeout_secs)
            .finish()
    }
}

impl StoreConfig {
    /// Creates a store configuration with default path and timeouts.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            backup_path: String::new(),
            username: username.into(),
            password: password.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            transfer_timeout_secs: DEFAULT_TRANSFER_TIMEOUT_SECS,
        }
    }

    /// Sets the directory below the endpoint.
    pub fn with_backup_path(mut self, backup_path: impl Into<String>) -> Self {
        self.backup_path = backup_path.into();
        self
    }

    /// Full URL of the snapshot container, without a trailing slash.
    pub fn container_url(&self) -> String {
        let base = self.url.trim_end_matches('/');
        let path = self.backup_path.trim_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Path segments of `backup_path`, outermost first.
    pub fn backup_path_segments(&self) -> Vec<&str> {
        self.backup_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

/// Fully resolved settings for one davsnap invocation
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Local directory that is archived and restored
    pub data_dir: PathBuf,

    /// Remote store settings
    pub store: StoreConfig,

    /// Number of snapshots retained after pruning
    pub keep: usize,

    /// Requested seconds between daemon cycles
    pub interval_secs: u64,
}

impl SnapshotConfig {
    /// Creates a configuration with default retention and interval.
    pub fn new(data_dir: impl Into<PathBuf>, store: StoreConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            store,
            keep: DEFAULT_KEEP,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }

    /// Merges a config file and command-line overrides, then validates.
    pub fn resolve(file: Option<ConfigFile>, overrides: ConfigOverrides) -> Result<Self> {
        let file = file.unwrap_or_default();
        let file_store = file.webdav.unwrap_or_default();

        let data_dir = overrides
            .data_dir
            .or(file.data_dir)
            .ok_or_else(|| Error::missing_field("data_dir"))?;
        let url = overrides
            .url
            .or(file_store.url)
            .ok_or_else(|| Error::missing_field("webdav.url"))?;
        let username = overrides
            .username
            .or(file_store.username)
            .ok_or_else(|| Error::missing_field("webdav.username"))?;
        let password = overrides
            .password
            .or(file_store.password)
            .ok_or_else(|| Error::missing_field("webdav.password"))?;

        let store = StoreConfig {
            url,
            backup_path: overrides
                .backup_path
                .or(file_store.backup_path)
                .unwrap_or_default(),
            username,
            password,
            request_timeout_secs: file_store
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            transfer_timeout_secs: file_store
                .transfer_timeout_secs
                .unwrap_or(DEFAULT_TRANSFER_TIMEOUT_SECS),
        };

        let config = Self {
            data_dir,
            store,
            keep: overrides.keep.or(file.keep).unwrap_or(DEFAULT_KEEP),
            interval_secs: overrides
                .interval_secs
                .or(file.interval)
                .unwrap_or(DEFAULT_INTERVAL_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would make every cycle fail or misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("data_dir must not be empty"));
        }
        let url = self.store.url.trim();
        if url.is_empty() {
            return Err(Error::invalid_config("webdav.url must not be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::invalid_config(format!(
                "webdav.url must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.keep == 0 {
            return Err(Error::invalid_config("keep must be at least 1"));
        }
        if self.store.request_timeout_secs == 0 || self.store.transfer_timeout_secs == 0 {
            return Err(Error::invalid_config("timeouts must be at least 1 second"));
        }
        Ok(())
    }

    /// Sleep between daemon cycles, never shorter than [`MIN_INTERVAL_SECS`].
    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_INTERVAL_SECS))
    }
}

/// On-disk layout of davsnap.yaml; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub keep: Option<usize>,
    pub interval: Option<u64>,
    pub webdav: Option<StoreSection>,
}

/// The `webdav:` section of davsnap.yaml
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    pub url: Option<String>,
    pub backup_path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub transfer_timeout_secs: Option<u64>,
}

impl fmt::Debug for StoreSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSection")
            .field("url", &self.url)
            .field("backup_path", &self.backup_path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ConfigFile {
    /// Load a config file from disk
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        tracing::debug!("Loaded configuration from {}", path);
        Self::parse(&content)
    }

    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub url: Option<String>,
    pub backup_path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep: Option<usize>,
    pub interval_secs: Option<u64>,
}
