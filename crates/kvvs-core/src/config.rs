//! Configuration management for kv-vs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{RetentionDefaults, seconds_delta};

/// Engine configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend selection and connection settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Archive and default hot-tier limits.
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Which commit store implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store; state lives as long as the process.
    #[default]
    Memory,
    /// Networked store on a KeyDB/Redis server.
    Keydb,
}

/// Storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default)]
    pub keydb: KeyDbConfig,
}

/// Connection and transaction settings for the networked backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDbConfig {
    /// `host:port` of the server.
    #[serde(default = "default_addr")]
    pub addr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Logical database index.
    #[serde(default)]
    pub database: i64,

    /// Deadline applied to every round trip.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Attempts before an optimistic commit gives up.
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,

    /// Base delay between optimistic attempts, multiplied by the attempt number.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for KeyDbConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            username: None,
            password: None,
            database: 0,
            operation_timeout_ms: default_operation_timeout_ms(),
            max_commit_retries: default_max_commit_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl KeyDbConfig {
    /// Redis connection URL built from the settings.
    #[must_use]
    pub fn connection_url(&self) -> String {
        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            (None, Some(pass)) => format!(":{pass}@"),
            (Some(user), None) => format!("{user}@"),
            (None, None) => String::new(),
        };
        format!("redis://{auth}{}/{}", self.addr, self.database)
    }

    /// Deadline applied to every round trip.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Base delay between optimistic attempts.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_addr() -> String {
    "localhost:6379".into()
}

const fn default_operation_timeout_ms() -> u64 {
    5_000
}

const fn default_max_commit_retries() -> u32 {
    64
}

const fn default_retry_backoff_ms() -> u64 {
    5
}

/// Where archived content goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveBackend {
    /// No archive; retention never moves content.
    None,
    /// In-memory map.
    Memory,
    /// Embedded database file at `archive_path`.
    #[default]
    Sled,
}

/// Retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub archive: ArchiveBackend,

    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,

    /// Default hot-commit limit for repositories without a policy.
    #[serde(default)]
    pub hot_commit_limit: i64,

    /// Default hot duration, in seconds, for repositories without a policy.
    #[serde(default)]
    pub hot_duration_secs: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            archive: ArchiveBackend::default(),
            archive_path: default_archive_path(),
            hot_commit_limit: 0,
            hot_duration_secs: 0,
        }
    }
}

impl RetentionConfig {
    /// Defaults handed to store constructors.
    #[must_use]
    pub fn defaults(&self) -> RetentionDefaults {
        RetentionDefaults {
            hot_commit_limit: self.hot_commit_limit,
            hot_duration: seconds_delta(self.hot_duration_secs),
        }
    }
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("data/archive.db")
}
