//! Cache storage ports.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ResourceRequest, StoreSummary, StoredResponse};

/// Process-wide registry of named stores.
///
/// Opening a name that already exists yields its current contents; a new
/// name yields an independent, empty store.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the named store, creating it if absent.
    async fn open(&self, name: &str) -> DomainResult<Arc<dyn CacheStore>>;

    /// Look up a store without creating it.
    async fn find(&self, name: &str) -> DomainResult<Option<Arc<dyn CacheStore>>>;

    /// List all stores with their entry counts.
    async fn list(&self) -> DomainResult<Vec<StoreSummary>>;
}

/// Handle to one named store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name.
    fn name(&self) -> &str;

    /// Entry answering `request`, if any.
    async fn lookup(&self, request: &ResourceRequest) -> DomainResult<Option<StoredResponse>>;

    /// Write a batch of entries atomically.
    ///
    /// Either every entry is persisted or none is. An entry replaces any
    /// existing entry with the same key.
    async fn put_all(&self, entries: Vec<StoredResponse>) -> DomainResult<()>;

    /// All entries ordered by key.
    async fn entries(&self) -> DomainResult<Vec<StoredResponse>>;

    /// Number of entries.
    async fn len(&self) -> DomainResult<u64>;
}
