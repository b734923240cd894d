//! Cache agent lifecycle.
//!
//! Ties the initializer and interceptor together behind an activation
//! barrier: requests are only intercepted once the named store has been
//! populated. Concurrent `activate` calls share a single initialization.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use url::Url;

use crate::domain::errors::{AgentError, InitError};
use crate::domain::models::{Config, Manifest, ResourceRequest};
use crate::domain::ports::{CacheStorage, ResourceFetcher};
use crate::services::request_interceptor::{RequestInterceptor, Resolution};
use crate::services::store_initializer::{InitReport, StoreInitializer};

/// An installed cache agent for one named store.
pub struct CacheAgent {
    store_name: String,
    manifest: Manifest,
    initializer: StoreInitializer,
    interceptor: RequestInterceptor,
    activation: OnceCell<InitReport>,
}

impl CacheAgent {
    pub fn new(
        store_name: impl Into<String>,
        manifest: Manifest,
        initializer: StoreInitializer,
        interceptor: RequestInterceptor,
    ) -> Self {
        Self {
            store_name: store_name.into(),
            manifest,
            initializer,
            interceptor,
            activation: OnceCell::new(),
        }
    }

    /// Build an agent from loaded configuration.
    pub fn from_config(
        config: &Config,
        origin: Url,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        let initializer = StoreInitializer::new(Arc::clone(&storage), Arc::clone(&fetcher), origin)
            .with_max_concurrency(config.initializer.max_concurrency);
        let interceptor = RequestInterceptor::new(storage, fetcher);
        Self::new(
            config.store_name.clone(),
            Manifest::new(config.manifest.iter().cloned()),
            initializer,
            interceptor,
        )
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Populate the store. Completes at most once; a failed activation can
    /// be retried by calling again.
    pub async fn activate(&self) -> Result<InitReport, InitError> {
        let report = self
            .activation
            .get_or_try_init(|| async {
                info!(store = %self.store_name, resources = self.manifest.len(), "activating cache agent");
                self.initializer.initialize(&self.store_name, &self.manifest).await
            })
            .await?;
        Ok(report.clone())
    }

    pub fn is_active(&self) -> bool {
        self.activation.initialized()
    }

    /// Intercept `request`. Fails with [`AgentError::NotActivated`] until
    /// activation has completed.
    pub async fn resolve(&self, request: &ResourceRequest) -> Result<Resolution, AgentError> {
        if !self.is_active() {
            return Err(AgentError::NotActivated);
        }
        Ok(self.interceptor.resolve(&self.store_name, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCacheStorage;
    use crate::adapters::mock::MockFetcher;
    use crate::services::request_interceptor::ResponseSource;
    use std::sync::atomic::Ordering;

    fn origin() -> Url {
        Url::parse("http://origin.test").unwrap()
    }

    fn agent(storage: &InMemoryCacheStorage, fetcher: &MockFetcher, manifest: &[&str]) -> CacheAgent {
        let storage: Arc<dyn CacheStorage> = Arc::new(storage.clone());
        let fetcher: Arc<dyn ResourceFetcher> = Arc::new(fetcher.clone());
        CacheAgent::new(
            "cache-v1",
            Manifest::new(manifest.iter().copied()),
            StoreInitializer::new(Arc::clone(&storage), Arc::clone(&fetcher), origin()),
            RequestInterceptor::new(storage, fetcher),
        )
    }

    fn get(path: &str) -> ResourceRequest {
        ResourceRequest::get(origin().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_resolve_before_activation_fails() {
        let fetcher = MockFetcher::new().with_ok("http://origin.test/", "<html>");
        let agent = agent(&InMemoryCacheStorage::new(), &fetcher, &["/"]);

        let err = agent.resolve(&get("/")).await.unwrap_err();
        assert!(matches!(err, AgentError::NotActivated));
        assert_eq!(fetcher.call_counter().load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_activate_then_resolve_hits() {
        let fetcher = MockFetcher::new().with_ok("http://origin.test/", "<html>");
        let agent = agent(&InMemoryCacheStorage::new(), &fetcher, &["/"]);

        let report = agent.activate().await.unwrap();
        assert_eq!(report.entries, 1);
        assert!(agent.is_active());

        let resolution = agent.resolve(&get("/")).await.unwrap();
        assert_eq!(resolution.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_concurrent_activation_initializes_once() {
        let fetcher = MockFetcher::new().with_ok("http://origin.test/", "<html>");
        let agent = agent(&InMemoryCacheStorage::new(), &fetcher, &["/"]);

        let (a, b) = tokio::join!(agent.activate(), agent.activate());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.calls_for("http://origin.test/"), 1);
    }

    #[tokio::test]
    async fn test_failed_activation_stays_inactive() {
        let fetcher = MockFetcher::new().with_status("http://origin.test/", 500, "boom");
        let agent = agent(&InMemoryCacheStorage::new(), &fetcher, &["/"]);

        assert!(agent.activate().await.is_err());
        assert!(!agent.is_active());
        assert!(matches!(agent.resolve(&get("/")).await, Err(AgentError::NotActivated)));
    }

    #[tokio::test]
    async fn test_fallback_error_surfaces_as_agent_error() {
        let fetcher = MockFetcher::new().with_ok("http://origin.test/", "<html>");
        let agent = agent(&InMemoryCacheStorage::new(), &fetcher, &["/"]);
        agent.activate().await.unwrap();

        let err = agent.resolve(&get("/offline")).await.unwrap_err();
        assert!(matches!(err, AgentError::Fetch(_)));
    }

    #[test]
    fn test_from_config_uses_configured_store() {
        let config = Config::default();
        let agent = CacheAgent::from_config(
            &config,
            origin(),
            Arc::new(InMemoryCacheStorage::new()),
            Arc::new(MockFetcher::new()),
        );
        assert_eq!(agent.store_name(), "usumm-cache-v1");
        assert_eq!(agent.manifest().len(), config.manifest.len());
        assert!(!agent.is_active());
    }
}
