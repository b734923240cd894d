//! Precache - intercepting resource cache
//!
//! Populates a named, durable store from a manifest of resources when an
//! agent activates, then answers every request from that store when it can
//! and from the network when it cannot.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): resource, response and store models, ports
//! - **Service Layer** (`services`): store initializer, request interceptor, agent lifecycle
//! - **Adapters** (`adapters`): SQLite and in-memory stores, HTTP fetcher, intercepting proxy
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use precache::services::CacheAgent;
//!
//! let agent = CacheAgent::from_config(&config, origin, storage, fetcher);
//! agent.activate().await?;
//! let resolution = agent.resolve(&request).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{AgentError, DomainError, FetchError, InitError};
pub use domain::models::{Config, Manifest, ResourceKey, ResourceRequest, ResourceResponse, StoredResponse};
pub use domain::ports::{CacheStorage, CacheStore, ResourceFetcher};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CacheAgent, RequestInterceptor, Resolution, ResponseSource, StoreInitializer};
