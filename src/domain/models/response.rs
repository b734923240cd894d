//! Network responses and the stored form of a cache entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::resource::{ResourceKey, ResourceRequest};

/// `Vary` names left out of matching.
///
/// Bodies are stored exactly as the origin sent them without content
/// negotiation headers, so any `Accept-Encoding` can be served the stored
/// representation.
pub const VARY_IGNORED: &[&str] = &["accept-encoding"];

fn vary_ignored(name: &str) -> bool {
    VARY_IGNORED.iter().any(|ignored| ignored.eq_ignore_ascii_case(name))
}

/// A response as produced by the network or replayed from a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Reason phrase (may be empty)
    #[serde(default)]
    pub status_text: String,
    /// Response headers, verbatim and in order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl ResourceResponse {
    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Lowercased request header names listed in every `Vary` header.
    pub fn vary_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("vary"))
            .flat_map(|(_, v)| v.split(','))
            .map(|name| name.trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// `Vary: *`, which no later request can ever satisfy.
    pub fn varies_on_everything(&self) -> bool {
        self.vary_names().iter().any(|name| name == "*")
    }
}

/// One persisted cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key: ResourceKey,
    pub response: ResourceResponse,
    /// Request header values captured for each name in the response's `Vary`
    pub vary: BTreeMap<String, Option<String>>,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Capture the response to `request` for storage.
    pub fn capture(request: &ResourceRequest, response: ResourceResponse) -> Self {
        let vary = response
            .vary_names()
            .into_iter()
            .filter(|name| name != "*" && !vary_ignored(name))
            .map(|name| {
                let value = request.header(&name).map(str::to_string);
                (name, value)
            })
            .collect();

        Self {
            key: request.key(),
            response,
            vary,
            stored_at: Utc::now(),
        }
    }

    /// Whether this entry answers `request`.
    ///
    /// Only `GET` requests match. Keys must be equal and every header named
    /// by the stored `Vary` must carry the captured value, except the names in
    /// [`VARY_IGNORED`].
    pub fn matches(&self, request: &ResourceRequest) -> bool {
        if !request.is_get() || request.key() != self.key {
            return false;
        }
        if self.response.varies_on_everything() {
            return false;
        }
        self.vary
            .iter()
            .filter(|(name, _)| !vary_ignored(name))
            .all(|(name, expected)| request.header(name) == expected.as_deref())
    }

    pub fn body_len(&self) -> usize {
        self.response.body.len()
    }
}
