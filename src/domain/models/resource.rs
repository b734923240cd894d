//! Resource requests and cache keys.
//!
//! A resource identifier from the manifest or an incoming request is turned
//! into an absolute URL by [`normalize`]. The normalized URL string is the
//! cache key:
//!
//! - relative identifiers are resolved against the origin base URL;
//! - scheme and host are lowercased, default ports dropped, an empty path
//!   becomes `/` and percent-encoding is canonicalized (WHATWG URL rules);
//! - the fragment is removed;
//! - the path is kept as-is, so `/a` and `/a/` are different keys;
//! - the query string is kept verbatim, so parameter order matters.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::domain::errors::InvalidResource;

/// Connection-scoped headers that are never forwarded or replayed.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Whether a header is connection-scoped and must not cross the proxy.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Normalize a resource identifier into an absolute `http(s)` URL.
pub fn normalize(resource: &str, base: &Url) -> Result<Url, InvalidResource> {
    let invalid = |reason: String| InvalidResource {
        resource: resource.to_string(),
        reason,
    };

    let trimmed = resource.trim();
    if trimmed.is_empty() {
        return Err(invalid("identifier is empty".to_string()));
    }

    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .join(trimmed)
            .map_err(|e| invalid(e.to_string()))?,
        Err(e) => return Err(invalid(e.to_string())),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Decode raw header bytes one byte per char (ISO-8859-1).
///
/// Header values are opaque octets; this mapping keeps obs-text bytes intact
/// through a `String` and back via [`header_value_bytes`].
pub fn header_value_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode a header value back to the bytes it was decoded from.
///
/// Chars above U+00FF can only come from user input and are written as UTF-8.
pub fn header_value_bytes(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len());
    for c in value.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(b) => bytes.push(b),
            Err(_) => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    bytes
}

/// How a fetch treats a redirect answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
    /// Follow redirects and return the final response.
    #[default]
    Follow,
    /// Return the 3xx response itself, `Location` and `Set-Cookie` included.
    Manual,
}

/// Canonical cache key of a request: its normalized absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Build the key for an already-normalized URL.
    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    /// Rebuild a key from its persisted form.
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request for a network resource, as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Upper-case HTTP method
    pub method: String,
    /// Absolute, normalized URL
    pub url: Url,
    /// Request headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Request body (empty for GET)
    #[serde(default)]
    pub body: Vec<u8>,
    /// Redirect handling when this request goes to the network
    #[serde(default)]
    pub redirect: RedirectMode,
}

impl ResourceRequest {
    /// Create a request with the given method.
    pub fn new(method: impl AsRef<str>, url: Url) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            url,
            headers: Vec::new(),
            body: Vec::new(),
            redirect: RedirectMode::Follow,
        }
    }

    /// Create a `GET` request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Set the redirect mode.
    #[must_use]
    pub fn with_redirect(mut self, redirect: RedirectMode) -> Self {
        self.redirect = redirect;
        self
    }

    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::from_url(&self.url)
    }
}
