//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::errors::FetchError;
use crate::domain::models::{ResourceRequest, ResourceResponse};
use crate::domain::ports::ResourceFetcher;

/// Scripted outcome for one URL.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Respond {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
    Fail(FetchError),
}

/// Fetcher answering from a fixed script keyed by absolute URL.
///
/// URLs without a script fail with a connection-refused network error.
#[derive(Clone, Default)]
pub struct MockFetcher {
    script: HashMap<String, MockOutcome>,
    calls: Arc<AtomicUsize>,
    calls_by_url: Arc<Mutex<HashMap<String, usize>>>,
    requests: Arc<Mutex<Vec<ResourceRequest>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `200 OK` and `body`.
    #[must_use]
    pub fn with_ok(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.with_response(url, 200, Vec::new(), body)
    }

    /// Answer `url` with `status` and `body`.
    #[must_use]
    pub fn with_status(self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.with_response(url, status, Vec::new(), body)
    }

    /// Answer `url` with a full response.
    #[must_use]
    pub fn with_response(
        mut self,
        url: &str,
        status: u16,
        headers: Vec<(String, String)>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.script.insert(
            url.to_string(),
            MockOutcome::Respond {
                status,
                headers,
                body: body.into(),
            },
        );
        self
    }

    /// Fail `url` with `error`.
    #[must_use]
    pub fn with_failure(mut self, url: &str, error: FetchError) -> Self {
        self.script.insert(url.to_string(), MockOutcome::Fail(error));
        self
    }

    /// Shared counter of all fetches made.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Number of fetches made for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls_by_url
            .lock()
            .map(|calls| calls.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, FetchError> {
        let url = request.url.as_str();
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls_by_url.lock() {
            *calls.entry(url.to_string()).or_insert(0) += 1;
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.script.get(url) {
            Some(MockOutcome::Respond { status, headers, body }) => Ok(ResourceResponse {
                url: url.to_string(),
                status: *status,
                status_text: String::new(),
                headers: headers.clone(),
                body: body.clone(),
            }),
            Some(MockOutcome::Fail(error)) => Err(error.clone()),
            None => Err(FetchError::Network {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}
