//! Connection pool for the cache database.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("Cannot create database directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot open database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("Database did not answer: {0}")]
    Ping(#[source] sqlx::Error),
}

/// Pool sizing and lock waiting.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database file
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    pub fn with_max_connections(max_connections: u32) -> Self {
        Self {
            max_connections: max_connections.max(1),
            ..Self::default()
        }
    }
}

/// Open a WAL-mode pool on `database_url`, creating the file and its
/// parent directory when missing.
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|source| ConnectionError::InvalidUrl {
            url: database_url.to_string(),
            source,
        })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    prepare_parent_dir(options.get_filename())?;

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

/// Single-connection in-memory pool for tests.
pub async fn in_memory_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str(MEMORY_URL)
        .map_err(|source| ConnectionError::InvalidUrl {
            url: MEMORY_URL.to_string(),
            source,
        })?
        .foreign_keys(true);

    // One connection: every handle must see the same in-memory database.
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

fn prepare_parent_dir(db_file: &Path) -> Result<(), ConnectionError> {
    match db_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => std::fs::create_dir_all(parent)
            .map_err(|source| ConnectionError::Directory {
                path: parent.to_path_buf(),
                source,
            }),
        _ => Ok(()),
    }
}

/// Round-trip a trivial query.
pub async fn ping(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(ConnectionError::Ping)
}
