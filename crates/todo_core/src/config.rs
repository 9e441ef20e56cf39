//! Runtime configuration for the todo core.
//!
//! # Responsibility
//! - Describe where the collection is stored and how acknowledgements are
//!   delivered.
//! - Build the concrete store and acknowledgement client from that
//!   description.
//!
//! # Invariants
//! - `db_path` is absolute.
//! - HTTP endpoints use `http://` or `https://`.
//! - `ack_timeout_ms` is greater than zero.

use crate::ack::{AckClient, HttpAckClient, LocalAckClient};
use crate::db::DbError;
use crate::store::SqliteKvStore;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DB_FILE_NAME: &str = "todo.sqlite3";
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 10_000;

/// Where acknowledgements are sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "url")]
pub enum AckEndpoint {
    /// In-process endpoint contract.
    #[default]
    Local,
    /// Remote endpoint URL.
    Http(String),
}

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoConfig {
    pub db_path: PathBuf,
    #[serde(default)]
    pub ack_endpoint: AckEndpoint,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

fn default_ack_timeout_ms() -> u64 {
    DEFAULT_ACK_TIMEOUT_MS
}

#[derive(Debug)]
pub enum ConfigError {
    EmptyDbPath,
    RelativeDbPath(PathBuf),
    InvalidAckUrl(String),
    ZeroTimeout,
    Db(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
            Self::RelativeDbPath(path) => {
                write!(f, "db_path must be an absolute path, got `{}`", path.display())
            }
            Self::InvalidAckUrl(url) => {
                write!(f, "ack endpoint must be an http(s) URL, got `{url}`")
            }
            Self::ZeroTimeout => write!(f, "ack_timeout_ms must be greater than zero"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl TodoConfig {
    /// Config with a local endpoint and default timeout.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ack_endpoint: AckEndpoint::Local,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
        }
    }

    /// Sets the endpoint from an optional URL; blank means local.
    pub fn with_ack_url(mut self, url: Option<&str>) -> Self {
        self.ack_endpoint = match url.map(str::trim) {
            Some(url) if !url.is_empty() => AckEndpoint::Http(url.to_string()),
            _ => AckEndpoint::Local,
        };
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        if !self.db_path.is_absolute() {
            return Err(ConfigError::RelativeDbPath(self.db_path.clone()));
        }
        if let AckEndpoint::Http(url) = &self.ack_endpoint {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidAckUrl(url.clone()));
            }
        }
        if self.ack_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Validates and opens the configured store.
    pub fn open_store(&self) -> Result<SqliteKvStore, ConfigError> {
        self.validate()?;
        Ok(SqliteKvStore::open(&self.db_path)?)
    }

    /// Builds the configured acknowledgement client.
    pub fn ack_client(&self) -> Arc<dyn AckClient> {
        match &self.ack_endpoint {
            AckEndpoint::Local => Arc::new(LocalAckClient),
            AckEndpoint::Http(url) => Arc::new(HttpAckClient::new(
                url.clone(),
                Duration::from_millis(self.ack_timeout_ms),
            )),
        }
    }
}
