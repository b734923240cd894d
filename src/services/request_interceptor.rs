//! Request Interceptor
//!
//! Resolves one request against a named store: a hit is replayed verbatim,
//! a miss goes to the network and the live response is returned without
//! being written back. The fallback never follows redirects: a 3xx from the
//! origin reaches the caller as-is.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::errors::FetchError;
use crate::domain::models::{RedirectMode, ResourceRequest, ResourceResponse, StoredResponse};
use crate::domain::ports::{CacheStorage, ResourceFetcher};

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved response and its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub response: ResourceResponse,
    pub source: ResponseSource,
}

impl Resolution {
    pub fn is_hit(&self) -> bool {
        self.source == ResponseSource::Cache
    }
}

/// Cache-first resolver with network fallback.
pub struct RequestInterceptor {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl RequestInterceptor {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { storage, fetcher }
    }

    /// Resolve `request` against `store_name`.
    ///
    /// Fallback fetch errors propagate unchanged. No retry and no stale
    /// substitution.
    #[instrument(skip(self, request), fields(store = %store_name, method = %request.method, url = %request.url))]
    pub async fn resolve(&self, store_name: &str, request: &ResourceRequest) -> Result<Resolution, FetchError> {
        if let Some(stored) = self.lookup(store_name, request).await {
            debug!(status = stored.response.status, "cache hit");
            return Ok(Resolution {
                response: stored.response,
                source: ResponseSource::Cache,
            });
        }

        debug!("cache miss, fetching from network");
        let passthrough = request.clone().with_redirect(RedirectMode::Manual);
        let response = self
            .fetcher
            .fetch(&passthrough)
            .await
            .inspect_err(|e| warn!(error = %e, "fallback fetch failed"))?;

        Ok(Resolution {
            response,
            source: ResponseSource::Network,
        })
    }

    /// Store lookup. Unknown stores are a miss and are not created.
    async fn lookup(&self, store_name: &str, request: &ResourceRequest) -> Option<StoredResponse> {
        if !request.is_get() {
            return None;
        }

        let store = match self.storage.find(store_name).await {
            Ok(Some(store)) => store,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "store unavailable, treating as miss");
                return None;
            }
        };

        match store.lookup(request).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "store lookup failed, treating as miss");
                None
            }
        }
    }
}
