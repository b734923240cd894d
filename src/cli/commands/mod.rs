//! CLI command implementations.

pub mod init;
pub mod populate;
pub mod resolve;
pub mod serve;
pub mod store;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::http::{HttpFetcher, HttpFetcherConfig};
use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteCacheStorage};
use crate::domain::models::Config;
use crate::domain::ports::{CacheStorage, ResourceFetcher};

/// Open the configured SQLite database as cache storage.
pub async fn open_storage(config: &Config) -> Result<Arc<dyn CacheStorage>> {
    let pool = initialize_database(
        &config.database.url(),
        Some(PoolConfig::with_max_connections(config.database.max_connections)),
    )
    .await
    .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    Ok(Arc::new(SqliteCacheStorage::new(pool)))
}

/// Live fetcher for the configured origin.
pub fn build_fetcher(config: &Config) -> Result<Arc<dyn ResourceFetcher>> {
    let fetcher =
        HttpFetcher::new(&HttpFetcherConfig::from(&config.origin)).context("Failed to build HTTP client")?;
    Ok(Arc::new(fetcher))
}
