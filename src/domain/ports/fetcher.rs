//! Network fetch port.

use async_trait::async_trait;

use crate::domain::errors::FetchError;
use crate::domain::models::{ResourceRequest, ResourceResponse};

/// Performs live network fetches.
///
/// Any HTTP status is a successful fetch; only transport failures are errors.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, FetchError>;
}
