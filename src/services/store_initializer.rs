//! Store Initializer
//!
//! Eagerly materializes the manifest into a named store at activation.
//! Fetches run with bounded concurrency; entries are written in one atomic
//! batch only after every fetch succeeded, so a failed call leaves the
//! store exactly as it found it.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::domain::errors::InitError;
use crate::domain::models::{Manifest, ResourceKey, ResourceRequest, StoredResponse};
use crate::domain::ports::{CacheStorage, ResourceFetcher};

/// Default number of manifest fetches in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Outcome of a successful initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub store_name: String,
    pub entries: usize,
    pub bytes: u64,
}

/// Populates a named store from a manifest.
pub struct StoreInitializer {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn ResourceFetcher>,
    origin: Url,
    max_concurrency: usize,
}

impl StoreInitializer {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn ResourceFetcher>, origin: Url) -> Self {
        Self {
            storage,
            fetcher,
            origin,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Limit concurrent fetches (at least one).
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Open `store_name` and persist every manifest entry, or nothing.
    pub async fn initialize(&self, store_name: &str, manifest: &Manifest) -> Result<InitReport, InitError> {
        self.initialize_with_progress(store_name, manifest, |_| {}).await
    }

    /// Like [`Self::initialize`], calling `on_fetched` after each successful fetch.
    #[instrument(skip(self, manifest, on_fetched), fields(store = %store_name, resources = manifest.len()))]
    pub async fn initialize_with_progress<F>(
        &self,
        store_name: &str,
        manifest: &Manifest,
        on_fetched: F,
    ) -> Result<InitReport, InitError>
    where
        F: Fn(&ResourceKey) + Send + Sync,
    {
        let requests = manifest.requests(&self.origin)?;

        let store = self.storage.open(store_name).await.map_err(|source| InitError::Storage {
            store: store_name.to_string(),
            source,
        })?;

        let on_fetched = &on_fetched;
        let entries: Vec<StoredResponse> = stream::iter(requests)
            .map(|request| async move {
                let entry = self.fetch_entry(request).await?;
                on_fetched(&entry.key);
                Ok::<_, InitError>(entry)
            })
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await
            .inspect_err(|e| warn!(store = %store_name, error = %e, "store initialization failed, nothing written"))?;

        let report = InitReport {
            store_name: store_name.to_string(),
            entries: entries.len(),
            bytes: entries.iter().map(|e| e.body_len() as u64).sum(),
        };

        store.put_all(entries).await.map_err(|source| {
            warn!(store = %store_name, error = %source, "failed to persist manifest entries");
            InitError::Storage {
                store: store_name.to_string(),
                source,
            }
        })?;

        info!(
            store = %report.store_name,
            entries = report.entries,
            bytes = report.bytes,
            "store initialized"
        );

        Ok(report)
    }

    async fn fetch_entry(&self, request: ResourceRequest) -> Result<StoredResponse, InitError> {
        let resource = request.url.to_string();

        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|source| InitError::Fetch {
                resource: resource.clone(),
                source,
            })?;

        if !response.is_success() {
            return Err(InitError::BadStatus {
                resource,
                status: response.status,
            });
        }
        if response.status == 206 {
            return Err(InitError::Uncacheable {
                resource,
                reason: "partial content".to_string(),
            });
        }
        if response.varies_on_everything() {
            return Err(InitError::Uncacheable {
                resource,
                reason: "response varies on '*'".to_string(),
            });
        }

        debug!(resource = %resource, status = response.status, bytes = response.body.len(), "fetched manifest entry");
        Ok(StoredResponse::capture(&request, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCacheStorage;
    use crate::adapters::mock::MockFetcher;
    use crate::domain::errors::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn origin() -> Url {
        Url::parse("http://origin.test").unwrap()
    }

    fn initializer(storage: &InMemoryCacheStorage, fetcher: MockFetcher) -> StoreInitializer {
        StoreInitializer::new(Arc::new(storage.clone()), Arc::new(fetcher), origin())
    }

    #[tokio::test]
    async fn test_initialize_populates_every_entry() {
        let storage = InMemoryCacheStorage::new();
        let fetcher = MockFetcher::new()
            .with_ok("http://origin.test/", "<html>")
            .with_ok("http://origin.test/static/style.css", "body{}");

        let report = initializer(&storage, fetcher)
            .initialize("cache-v1", &Manifest::new(["/", "/static/style.css"]))
            .await
            .unwrap();

        assert_eq!(report.entries, 2);
        assert_eq!(report.bytes, 12);

        let store = storage.find("cache-v1").await.unwrap().unwrap();
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_bad_status_fails_and_writes_nothing() {
        let storage = InMemoryCacheStorage::new();
        let fetcher = MockFetcher::new()
            .with_ok("http://origin.test/", "<html>")
            .with_status("http://origin.test/static/style.css", 404, "missing");

        let err = initializer(&storage, fetcher)
            .initialize("cache-v1", &Manifest::new(["/", "/static/style.css"]))
            .await
            .unwrap_err();

        assert!(matches!(err, InitError::BadStatus { status: 404, .. }));
        let store = storage.find("cache-v1").await.unwrap().unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_network_failure_names_resource() {
        let storage = InMemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_ok("http://origin.test/", "<html>");

        let err = initializer(&storage, fetcher)
            .initialize("cache-v1", &Manifest::new(["/", "/download_feed"]))
            .await
            .unwrap_err();

        match err {
            InitError::Fetch { resource, source } => {
                assert_eq!(resource, "http://origin.test/download_feed");
                assert!(matches!(source, FetchError::Network { .. }));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_vary_star_is_uncacheable() {
        let storage = InMemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_response(
            "http://origin.test/",
            200,
            vec![("Vary".to_string(), "*".to_string())],
            "<html>",
        );

        let err = initializer(&storage, fetcher)
            .initialize("cache-v1", &Manifest::new(["/"]))
            .await
            .unwrap_err();
        assert!(matches!(err, InitError::Uncacheable { .. }));
    }

    #[tokio::test]
    async fn test_partial_content_is_uncacheable() {
        let storage = InMemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_status("http://origin.test/", 206, "<ht");

        let err = initializer(&storage, fetcher)
            .initialize("cache-v1", &Manifest::new(["/"]))
            .await
            .unwrap_err();
        assert!(matches!(err, InitError::Uncacheable { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_manifest_entry_fails_before_fetching() {
        let storage = InMemoryCacheStorage::new();
        let fetcher = MockFetcher::new().with_ok("http://origin.test/", "<html>");
        let calls = fetcher.call_counter();

        let err = initializer(&storage, fetcher)
            .initialize("cache-v1", &Manifest::new(["/", "/#again"]))
            .await
            .unwrap_err();

        assert!(matches!(err, InitError::DuplicateResource { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(storage.find("cache-v1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_progress_callback_sees_each_entry() {
        let storage = InMemoryCacheStorage::new();
        let fetcher = MockFetcher::new()
            .with_ok("http://origin.test/", "a")
            .with_ok("http://origin.test/b", "b")
            .with_ok("http://origin.test/c", "c");
        let seen = AtomicUsize::new(0);

        initializer(&storage, fetcher)
            .with_max_concurrency(1)
            .initialize_with_progress("cache-v1", &Manifest::new(["/", "/b", "/c"]), |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_manifest_opens_store() {
        let storage = InMemoryCacheStorage::new();
        let report = initializer(&storage, MockFetcher::new())
            .initialize("cache-v1", &Manifest::new(Vec::<String>::new()))
            .await
            .unwrap();

        assert_eq!(report.entries, 0);
        assert!(storage.find("cache-v1").await.unwrap().is_some());
    }
}
