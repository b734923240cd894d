//! HTTP fetcher backed by `reqwest`.
//!
//! Sends the request as given (minus hop-by-hop headers) and returns status,
//! headers and body untouched. Redirects are followed only for requests in
//! [`RedirectMode::Follow`]; a [`RedirectMode::Manual`] request gets the 3xx
//! answer itself. Header bytes pass through unchanged. No retries.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{redirect, Method};
use std::time::Duration;

use crate::domain::errors::FetchError;
use crate::domain::models::{
    header_value_bytes, header_value_from_bytes, is_hop_by_hop, OriginConfig, RedirectMode, ResourceRequest,
    ResourceResponse,
};
use crate::domain::ports::ResourceFetcher;

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        let origin = OriginConfig::default();
        Self {
            timeout: Duration::from_secs(origin.timeout_secs),
            user_agent: origin.user_agent,
        }
    }
}

impl From<&OriginConfig> for HttpFetcherConfig {
    fn from(origin: &OriginConfig) -> Self {
        Self {
            timeout: Duration::from_secs(origin.timeout_secs),
            user_agent: origin.user_agent.clone(),
        }
    }
}

/// Live network fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    following: reqwest::Client,
    manual: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpFetcherConfig) -> Result<Self, reqwest::Error> {
        let client = |policy: redirect::Policy| {
            reqwest::Client::builder()
                .timeout(config.timeout)
                .user_agent(&config.user_agent)
                .redirect(policy)
                .build()
        };
        Ok(Self {
            following: client(redirect::Policy::default())?,
            manual: client(redirect::Policy::none())?,
        })
    }

    fn client_for(&self, mode: RedirectMode) -> &reqwest::Client {
        match mode {
            RedirectMode::Follow => &self.following,
            RedirectMode::Manual => &self.manual,
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, FetchError> {
        let url = request.url.to_string();

        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| FetchError::InvalidRequest {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = self.client_for(request.redirect).request(method, request.url.clone());
        for (name, value) in &request.headers {
            if is_hop_by_hop(name) || name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            let header = HeaderName::from_bytes(name.as_bytes())
                .ok()
                .zip(HeaderValue::from_bytes(&header_value_bytes(value)).ok());
            let Some((name, value)) = header else {
                return Err(FetchError::InvalidRequest {
                    url,
                    reason: format!("invalid header '{name}'"),
                });
            };
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| classify(&url, &e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), header_value_from_bytes(value.as_bytes())))
            .collect();

        let body = response.bytes().await.map_err(|e| classify(&url, &e))?;

        tracing::debug!(url = %url, status = status.as_u16(), bytes = body.len(), "fetched resource");

        Ok(ResourceResponse {
            url: final_url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
        })
    }
}

fn classify(url: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if err.is_builder() {
        FetchError::InvalidRequest {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
