//! SQLite implementation of CacheStorage.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

use super::parse_datetime;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ResourceKey, ResourceRequest, ResourceResponse, StoreSummary, StoredResponse,
};
use crate::domain::ports::{CacheStorage, CacheStore};

#[derive(Clone)]
pub struct SqliteCacheStorage {
    pool: SqlitePool,
}

impl SqliteCacheStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn open(&self, name: &str) -> DomainResult<Arc<dyn CacheStore>> {
        if name.is_empty() {
            return Err(DomainError::ValidationFailed("Store name cannot be empty".to_string()));
        }

        sqlx::query("INSERT INTO cache_stores (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(Arc::new(SqliteCacheStore {
            pool: self.pool.clone(),
            name: name.to_string(),
        }))
    }

    async fn find(&self, name: &str) -> DomainResult<Option<Arc<dyn CacheStore>>> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT name FROM cache_stores WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(exists.map(|(name,)| {
            Arc::new(SqliteCacheStore {
                pool: self.pool.clone(),
                name,
            }) as Arc<dyn CacheStore>
        }))
    }

    async fn list(&self) -> DomainResult<Vec<StoreSummary>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"SELECT s.name, s.created_at, COUNT(e.url)
               FROM cache_stores s
               LEFT JOIN cache_entries e ON e.store_name = s.name
               GROUP BY s.name, s.created_at
               ORDER BY s.name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(name, created_at, count)| {
                Ok(StoreSummary {
                    name,
                    entry_count: u64::try_from(count).unwrap_or_default(),
                    created_at: parse_datetime(&created_at)?,
                })
            })
            .collect()
    }
}

pub struct SqliteCacheStore {
    pool: SqlitePool,
    name: String,
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, request: &ResourceRequest) -> DomainResult<Option<StoredResponse>> {
        if !request.is_get() {
            return Ok(None);
        }

        let sql = format!("SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE store_name = ? AND url = ?");
        let row: Option<EntryRow> = sqlx::query_as(&sql)
            .bind(&self.name)
            .bind(request.key().as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored: StoredResponse = row.try_into()?;
        Ok(stored.matches(request).then_some(stored))
    }

    async fn put_all(&self, entries: Vec<StoredResponse>) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        for entry in &entries {
            let headers = serde_json::to_string(&entry.response.headers)?;
            let vary = serde_json::to_string(&entry.vary)?;

            sqlx::query(
                r#"INSERT INTO cache_entries (store_name, url, method, response_url, status, status_text, headers, vary, body, stored_at)
                   VALUES (?, ?, 'GET', ?, ?, ?, ?, ?, ?, ?)
                   ON CONFLICT(store_name, url) DO UPDATE SET
                       response_url = excluded.response_url,
                       status = excluded.status,
                       status_text = excluded.status_text,
                       headers = excluded.headers,
                       vary = excluded.vary,
                       body = excluded.body,
                       stored_at = excluded.stored_at"#
            )
            .bind(&self.name)
            .bind(entry.key.as_str())
            .bind(&entry.response.url)
            .bind(i64::from(entry.response.status))
            .bind(&entry.response.status_text)
            .bind(headers)
            .bind(vary)
            .bind(&entry.response.body)
            .bind(entry.stored_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn entries(&self) -> DomainResult<Vec<StoredResponse>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE store_name = ? ORDER BY url");
        let rows: Vec<EntryRow> = sqlx::query_as(&sql)
            .bind(&self.name)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn len(&self) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache_entries WHERE store_name = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

const ENTRY_COLUMNS: &str = "url, response_url, status, status_text, headers, vary, body, stored_at";

#[derive(sqlx::FromRow)]
struct EntryRow {
    url: String,
    response_url: String,
    status: i64,
    status_text: String,
    headers: String,
    vary: String,
    body: Vec<u8>,
    stored_at: String,
}

impl TryFrom<EntryRow> for StoredResponse {
    type Error = DomainError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let status = u16::try_from(row.status)
            .map_err(|_| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        Ok(StoredResponse {
            key: ResourceKey::from_stored(row.url),
            response: ResourceResponse {
                url: row.response_url,
                status,
                status_text: row.status_text,
                headers: serde_json::from_str(&row.headers)?,
                body: row.body,
            },
            vary: serde_json::from_str(&row.vary)?,
            stored_at: parse_datetime(&row.stored_at)?,
        })
    }
}
