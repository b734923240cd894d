//! Embedded schema migrations.
//!
//! Each migration runs in its own transaction together with the row that
//! records it in `schema_migrations`, so a crash never leaves a half-applied
//! version behind.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} ({description}) failed: {source}")]
    Apply {
        version: i64,
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("Cannot read or create schema_migrations: {0}")]
    Bookkeeping(#[source] sqlx::Error),
}

/// One versioned schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

const EMBEDDED: &[Migration] = &[Migration {
    version: 1,
    description: "cache stores and entries",
    sql: include_str!("../../../migrations/001_cache_stores.sql"),
}];

/// Migrations shipped with the binary, in version order.
pub fn all_embedded_migrations() -> &'static [Migration] {
    EMBEDDED
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every migration newer than the recorded schema version.
    /// Returns how many were applied.
    pub async fn run(&self, migrations: &[Migration]) -> Result<usize, MigrationError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::Bookkeeping)?;

        let current = self.schema_version().await?;
        let mut applied = 0;
        for migration in migrations.iter().filter(|m| m.version > current) {
            self.apply(migration).await.map_err(|source| MigrationError::Apply {
                version: migration.version,
                description: migration.description,
                source,
            })?;
            debug!(version = migration.version, description = migration.description, "applied migration");
            applied += 1;
        }
        Ok(applied)
    }

    /// Highest applied version, 0 for a fresh database.
    pub async fn schema_version(&self) -> Result<i64, MigrationError> {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::Bookkeeping)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::in_memory_pool;

    #[tokio::test]
    async fn test_migrations_are_applied_once() {
        let migrator = Migrator::new(in_memory_pool().await.unwrap());
        assert_eq!(migrator.run(all_embedded_migrations()).await.unwrap(), 1);
        assert_eq!(migrator.schema_version().await.unwrap(), 1);
        assert_eq!(migrator.run(all_embedded_migrations()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_tables_exist() {
        let pool = in_memory_pool().await.unwrap();
        Migrator::new(pool.clone()).run(all_embedded_migrations()).await.unwrap();

        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name LIKE 'cache_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(names, vec!["cache_entries", "cache_stores"]);
    }

    #[tokio::test]
    async fn test_failed_migration_is_not_recorded() {
        let migrator = Migrator::new(in_memory_pool().await.unwrap());
        let broken = [Migration {
            version: 7,
            description: "broken",
            sql: "CREATE TABLE nope (",
        }];

        let err = migrator.run(&broken).await.unwrap_err();
        assert!(matches!(err, MigrationError::Apply { version: 7, .. }));
        assert_eq!(migrator.schema_version().await.unwrap(), 0);
    }
}
