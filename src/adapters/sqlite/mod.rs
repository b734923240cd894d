//! SQLite-backed cache storage.

pub mod cache_storage;
pub mod connection;
pub mod migrations;

pub use cache_storage::{SqliteCacheStorage, SqliteCacheStore};
pub use connection::{create_pool, in_memory_pool, ping, ConnectionError, PoolConfig};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};

/// Timestamps are stored as RFC 3339 text.
pub(crate) fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(format!("bad timestamp '{s}': {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Open `database_url` and bring its schema up to date.
pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    Migrator::new(pool.clone()).run(all_embedded_migrations()).await?;
    Ok(pool)
}

/// In-memory database with the schema applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = in_memory_pool().await?;
    Migrator::new(pool.clone()).run(all_embedded_migrations()).await?;
    Ok(pool)
}
