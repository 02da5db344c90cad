//! Process configuration for the user store.
//!
//! Values come from the environment (`USERSTORE_*`); front ends may override
//! individual fields afterwards.

use crate::bridge::{QueryBridge, SqliteExecutor};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "USERSTORE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "USERSTORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "USERSTORE_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite file; `None` keeps the store in memory for the process lifetime.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    /// Opens the database and starts the executor behind a new bridge.
    pub fn open_bridge(&self) -> Result<QueryBridge, StartupError> {
        let conn = match &self.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        let executor = SqliteExecutor::spawn_shared(conn).map_err(StartupError::Spawn)?;
        Ok(QueryBridge::new(executor))
    }
}

#[derive(Debug)]
pub enum StartupError {
    Db(DbError),
    Spawn(std::io::Error),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "failed to open user store: {err}"),
            Self::Spawn(err) => write!(f, "failed to start database worker: {err}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Spawn(err) => Some(err),
        }
    }
}

impl From<DbError> for StartupError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}
