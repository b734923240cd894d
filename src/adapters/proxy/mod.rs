//! Intercepting HTTP proxy.
//!
//! Host adapter that puts a [`CacheAgent`] in front of the origin: every
//! inbound request is translated into a [`ResourceRequest`], resolved through
//! the agent, and written back with an `x-precache: hit|miss` header.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::errors::AgentError;
use crate::domain::models::{
    header_value_bytes, header_value_from_bytes, is_hop_by_hop, normalize, ProxyConfig, ResourceRequest,
    ResourceResponse,
};
use crate::services::{CacheAgent, Resolution, ResponseSource};

/// Header carrying `hit` or `miss` on every intercepted response.
pub const SOURCE_HEADER: &str = "x-precache";

/// Health endpoint path. Never routed through the cache.
pub const HEALTH_PATH: &str = "/__precache/health";

const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the intercepting proxy.
#[derive(Debug, Clone)]
pub struct InterceptServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Largest request body accepted.
    pub max_body_bytes: usize,
}

impl Default for InterceptServerConfig {
    fn default() -> Self {
        Self::from(&ProxyConfig::default())
    }
}

impl From<&ProxyConfig> for InterceptServerConfig {
    fn from(proxy: &ProxyConfig) -> Self {
        Self {
            host: proxy.host.clone(),
            port: proxy.port,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Clone)]
struct ProxyState {
    agent: Arc<CacheAgent>,
    origin: Arc<Url>,
    max_body_bytes: usize,
}

/// HTTP server routing every request through a cache agent.
pub struct InterceptServer {
    config: InterceptServerConfig,
    agent: Arc<CacheAgent>,
    origin: Url,
}

impl InterceptServer {
    pub fn new(config: InterceptServerConfig, agent: Arc<CacheAgent>, origin: Url) -> Self {
        Self { config, agent, origin }
    }

    pub fn build_router(&self) -> Router {
        let state = ProxyState {
            agent: Arc::clone(&self.agent),
            origin: Arc::new(self.origin.clone()),
            max_body_bytes: self.config.max_body_bytes,
        };

        Router::new()
            .route(HEALTH_PATH, get(health_check))
            .fallback(intercept)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Address the server binds to.
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.config.host, self.config.port).parse()
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr()?;
        let router = self.build_router();

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, store = %self.agent.store_name(), origin = %self.origin, "intercepting proxy listening");

        axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
        info!("intercepting proxy stopped");
        Ok(())
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn intercept(State(state): State<ProxyState>, request: Request) -> Response {
    let request_id = Uuid::new_v4();
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response(),
    };

    let target = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = match normalize(target, &state.origin) {
        Ok(url) => url,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let mut resource = ResourceRequest::new(parts.method.as_str(), url).with_body(body.to_vec());
    for (name, value) in &parts.headers {
        if is_hop_by_hop(name.as_str()) || *name == axum::http::header::HOST {
            continue;
        }
        resource = resource.with_header(name.as_str(), header_value_from_bytes(value.as_bytes()));
    }

    match state.agent.resolve(&resource).await {
        Ok(resolution) => {
            info!(
                %request_id,
                method = %resource.method,
                url = %resource.url,
                status = resolution.response.status,
                source = %resolution.source,
                "intercepted"
            );
            into_http_response(resolution)
        }
        Err(AgentError::NotActivated) => {
            warn!(%request_id, url = %resource.url, "request before activation");
            (StatusCode::SERVICE_UNAVAILABLE, AgentError::NotActivated.to_string()).into_response()
        }
        Err(AgentError::Fetch(e)) => {
            warn!(%request_id, url = %resource.url, error = %e, "fallback fetch failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

fn source_label(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Cache => "hit",
        ResponseSource::Network => "miss",
    }
}

fn into_http_response(resolution: Resolution) -> Response {
    let Resolution { response, source } = resolution;
    let ResourceResponse {
        status, headers, body, ..
    } = response;

    let mut http = Response::new(Body::from(body));
    *http.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);

    let out = http.headers_mut();
    for (name, value) in headers {
        if is_hop_by_hop(&name) || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        // Headers that cannot be re-encoded are dropped.
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(&header_value_bytes(&value)),
        ) {
            out.append(name, value);
        }
    }
    out.insert(SOURCE_HEADER, HeaderValue::from_static(source_label(source)));

    http
}
