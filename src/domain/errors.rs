//! Domain errors for the precache system.

use thiserror::Error;

/// Storage-level errors raised by cache store adapters.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// A resource identifier that cannot be turned into a fetchable URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid resource '{resource}': {reason}")]
pub struct InvalidResource {
    pub resource: String,
    pub reason: String,
}

/// Network-level failure of a single fetch.
///
/// Non-success HTTP statuses are not fetch errors: a 404 is a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidRequest { url, .. } | Self::Timeout { url } | Self::Network { url, .. } => {
                url
            }
        }
    }
}

/// Failure of store initialization. Always names the offending resource or store.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    InvalidResource(#[from] InvalidResource),

    #[error("Manifest lists '{resource}' more than once")]
    DuplicateResource { resource: String },

    #[error("Failed to fetch '{resource}': {source}")]
    Fetch {
        resource: String,
        #[source]
        source: FetchError,
    },

    #[error("Fetching '{resource}' returned non-success status {status}")]
    BadStatus { resource: String, status: u16 },

    #[error("Response for '{resource}' cannot be cached: {reason}")]
    Uncacheable { resource: String, reason: String },

    #[error("Storage failure in store '{store}': {source}")]
    Storage {
        store: String,
        #[source]
        source: DomainError,
    },
}

impl InitError {
    /// Whether the failure came from the network rather than local storage.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::BadStatus { .. } | Self::Uncacheable { .. })
    }

    /// Whether the failure came from the local store.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Errors returned by the activated agent facade.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Cache agent has not been activated")]
    NotActivated,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
