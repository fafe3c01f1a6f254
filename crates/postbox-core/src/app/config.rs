//! Queue configuration.
//!
//! Read from TOML; every key is optional and falls back to the defaults
//! below.
//!
//! ```toml
//! table = "mail_queue"
//! mails_per_round = 10
//! max_attempts = 3
//! auto_purge = true
//! send_timeout_secs = 30
//!
//! [store]
//! kind = "file"
//! root = "/var/spool/postbox"
//!
//! [transport]
//! host = "smtp.example.org"
//! port = 587
//! encryption = "starttls"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{QueueError, StoreError};
use crate::impls::{FileQueueStore, InMemoryQueueStore};
use crate::ports::QueueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Name of the queue table.
    #[serde(default = "defaults::table")]
    pub table: String,

    /// Upper bound on items processed per round.
    #[serde(default = "defaults::mails_per_round")]
    pub mails_per_round: usize,

    /// Items with this many attempts are never selected again.
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Purge sent items at the end of every round.
    #[serde(default = "defaults::auto_purge")]
    pub auto_purge: bool,

    /// Ceiling for one transport send.
    #[serde(default = "defaults::send_timeout_secs")]
    pub send_timeout_secs: u64,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            table: defaults::table(),
            mails_per_round: defaults::mails_per_round(),
            max_attempts: defaults::max_attempts(),
            auto_purge: defaults::auto_purge(),
            send_timeout_secs: defaults::send_timeout_secs(),
            store: StoreConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl QueueConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, QueueError> {
        toml::from_str(source).map_err(|e| QueueError::Configuration(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            QueueError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject settings the processor cannot run with.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.table.trim().is_empty() {
            return Err(QueueError::Configuration("table name is empty".into()));
        }
        if self.mails_per_round == 0 {
            return Err(QueueError::Configuration(
                "mails_per_round must be at least 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(QueueError::Configuration(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.send_timeout_secs == 0 {
            return Err(QueueError::Configuration(
                "send_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Open the configured store for `self.table`.
    pub fn open_store(&self) -> Result<Arc<dyn QueueStore>, StoreError> {
        self.store.open(&self.table)
    }
}

/// Where queue rows live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process memory; lost on exit.
    #[default]
    Memory,

    /// One JSON file per row under `root/<table>/`.
    File { root: PathBuf },
}

impl StoreConfig {
    pub fn open(&self, table: &str) -> Result<Arc<dyn QueueStore>, StoreError> {
        Ok(match self {
            StoreConfig::Memory => Arc::new(InMemoryQueueStore::new(table)),
            StoreConfig::File { root } => Arc::new(FileQueueStore::new(root, table)?),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    None,
    #[default]
    Starttls,
    Tls,
}

/// Connection settings handed to the mailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default)]
    pub encryption: Encryption,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            username: None,
            password: None,
            encryption: Encryption::default(),
        }
    }
}

mod defaults {
    pub fn table() -> String {
        "mail_queue".to_string()
    }
    pub const fn mails_per_round() -> usize {
        10
    }
    pub const fn max_attempts() -> u32 {
        3
    }
    pub const fn auto_purge() -> bool {
        true
    }
    pub const fn send_timeout_secs() -> u64 {
        30
    }
    pub fn host() -> String {
        "localhost".to_string()
    }
    pub const fn port() -> u16 {
        587
    }
}
