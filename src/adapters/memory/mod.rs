//! In-memory cache storage.
//!
//! Non-durable stand-in for the SQLite adapter, used by tests and by
//! `--ephemeral` runs. Same semantics: lazy creation by name, atomic batch
//! writes, last write wins per key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ResourceKey, ResourceRequest, StoreSummary, StoredResponse};
use crate::domain::ports::{CacheStorage, CacheStore};

/// Registry of in-memory stores.
#[derive(Clone, Default)]
pub struct InMemoryCacheStorage {
    stores: Arc<RwLock<BTreeMap<String, Arc<InMemoryCacheStore>>>>,
}

impl InMemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for InMemoryCacheStorage {
    async fn open(&self, name: &str) -> DomainResult<Arc<dyn CacheStore>> {
        if name.is_empty() {
            return Err(DomainError::ValidationFailed("Store name cannot be empty".to_string()));
        }

        let mut stores = self.stores.write().await;
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryCacheStore::new(name)))
            .clone();
        Ok(store)
    }

    async fn find(&self, name: &str) -> DomainResult<Option<Arc<dyn CacheStore>>> {
        let stores = self.stores.read().await;
        Ok(stores
            .get(name)
            .map(|store| store.clone() as Arc<dyn CacheStore>))
    }

    async fn list(&self) -> DomainResult<Vec<StoreSummary>> {
        let stores = self.stores.read().await;
        let mut summaries = Vec::with_capacity(stores.len());
        for store in stores.values() {
            summaries.push(StoreSummary {
                name: store.name.clone(),
                entry_count: store.len().await?,
                created_at: store.created_at,
            });
        }
        Ok(summaries)
    }
}

/// One in-memory store.
pub struct InMemoryCacheStore {
    name: String,
    created_at: DateTime<Utc>,
    entries: RwLock<BTreeMap<ResourceKey, StoredResponse>>,
}

impl InMemoryCacheStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            created_at: Utc::now(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, request: &ResourceRequest) -> DomainResult<Option<StoredResponse>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&request.key())
            .filter(|stored| stored.matches(request))
            .cloned())
    }

    async fn put_all(&self, batch: Vec<StoredResponse>) -> DomainResult<()> {
        let mut entries = self.entries.write().await;
        for entry in batch {
            entries.insert(entry.key.clone(), entry);
        }
        Ok(())
    }

    async fn entries(&self) -> DomainResult<Vec<StoredResponse>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn len(&self) -> DomainResult<u64> {
        Ok(self.entries.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ResourceResponse;
    use url::Url;

    fn request(path: &str) -> ResourceRequest {
        ResourceRequest::get(Url::parse("http://origin.test").unwrap().join(path).unwrap())
    }

    fn entry(path: &str) -> StoredResponse {
        StoredResponse::capture(
            &request(path),
            ResourceResponse {
                url: request(path).url.to_string(),
                status: 200,
                status_text: "OK".to_string(),
                headers: vec![],
                body: path.as_bytes().to_vec(),
            },
        )
    }

    #[tokio::test]
    async fn test_open_same_name_shares_contents() {
        let storage = InMemoryCacheStorage::new();
        storage.open("cache-v1").await.unwrap().put_all(vec![entry("/")]).await.unwrap();

        let again = storage.open("cache-v1").await.unwrap();
        assert!(again.lookup(&request("/")).await.unwrap().is_some());

        let other = storage.open("cache-v2").await.unwrap();
        assert!(other.lookup(&request("/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_does_not_create() {
        let storage = InMemoryCacheStorage::new();
        assert!(storage.find("cache-v1").await.unwrap().is_none());
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_counts_entries() {
        let storage = InMemoryCacheStorage::new();
        storage
            .open("cache-v1")
            .await
            .unwrap()
            .put_all(vec![entry("/"), entry("/static/style.css")])
            .await
            .unwrap();

        let summaries = storage.list().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].entry_count, 2);
    }
}
