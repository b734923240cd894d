//! Port trait definitions (Hexagonal Architecture)
//!
//! - CacheStorage / CacheStore: named persistent stores of responses
//! - ResourceFetcher: live network access
//!
//! Services depend only on these traits; adapters provide SQLite, in-memory
//! and HTTP implementations.

pub mod cache_storage;
pub mod fetcher;

pub use cache_storage::{CacheStorage, CacheStore};
pub use fetcher::ResourceFetcher;
