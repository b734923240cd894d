//! Precache manifest and store summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

use super::resource::{normalize, ResourceKey, ResourceRequest};
use crate::domain::errors::InitError;

/// Fixed, ordered list of resource identifiers cached at activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turn every entry into a `GET` request against `origin`.
    ///
    /// Fails on the first entry that does not normalize, or on an entry whose
    /// key repeats an earlier one.
    pub fn requests(&self, origin: &Url) -> Result<Vec<ResourceRequest>, InitError> {
        let mut seen: HashSet<ResourceKey> = HashSet::with_capacity(self.entries.len());
        let mut requests = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let request = ResourceRequest::get(normalize(entry, origin)?);
            if !seen.insert(request.key()) {
                return Err(InitError::DuplicateResource {
                    resource: entry.clone(),
                });
            }
            requests.push(request);
        }

        Ok(requests)
    }
}

/// Name and size of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub name: String,
    pub entry_count: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://127.0.0.1:5000").unwrap()
    }

    #[test]
    fn test_requests_keep_manifest_order() {
        let manifest = Manifest::new(["/", "/static/style.css", "/download_feed"]);
        let requests = manifest.requests(&origin()).unwrap();

        let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:5000/",
                "http://127.0.0.1:5000/static/style.css",
                "http://127.0.0.1:5000/download_feed",
            ]
        );
        assert!(requests.iter().all(ResourceRequest::is_get));
    }

    #[test]
    fn test_duplicates_after_normalization_are_rejected() {
        let manifest = Manifest::new(["/", "http://127.0.0.1:5000/#top"]);
        let err = manifest.requests(&origin()).unwrap_err();
        assert!(matches!(
            err,
            InitError::DuplicateResource { ref resource } if resource == "http://127.0.0.1:5000/#top"
        ));
    }

    #[test]
    fn test_invalid_entry_is_rejected() {
        let manifest = Manifest::new(["/", "mailto:someone@example.com"]);
        let err = manifest.requests(&origin()).unwrap_err();
        assert!(matches!(err, InitError::InvalidResource(_)));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::new(Vec::<String>::new());
        assert!(manifest.is_empty());
        assert!(manifest.requests(&origin()).unwrap().is_empty());
    }
}
