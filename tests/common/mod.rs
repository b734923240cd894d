//! Common test utilities for integration tests
//!
//! Provides shared fixtures for SQLite-backed stores, live HTTP fetchers
//! pointed at a mock origin, and agent wiring.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

use precache::adapters::http::{HttpFetcher, HttpFetcherConfig};
use precache::adapters::sqlite::{initialize_database, SqliteCacheStorage};
use precache::domain::models::Manifest;
use precache::domain::ports::{CacheStorage, ResourceFetcher};
use precache::services::{CacheAgent, RequestInterceptor, StoreInitializer};

/// Create a temporary test database
///
/// Returns the path to a SQLite database file in a temporary directory.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("precache.db");
    (dir, db_path)
}

/// Open (or reopen) a migrated SQLite store registry at `path`.
pub async fn sqlite_storage(path: &PathBuf) -> Arc<dyn CacheStorage> {
    let url = format!("sqlite:{}", path.display());
    let pool = initialize_database(&url, None)
        .await
        .expect("Failed to initialize database");
    Arc::new(SqliteCacheStorage::new(pool))
}

/// Live fetcher with a short timeout.
pub fn http_fetcher() -> Arc<dyn ResourceFetcher> {
    let fetcher = HttpFetcher::new(&HttpFetcherConfig {
        timeout: Duration::from_secs(5),
        user_agent: "precache-tests".to_string(),
    })
    .expect("Failed to build HTTP client");
    Arc::new(fetcher)
}

/// Base URL of a mockito server.
pub fn origin(server: &mockito::Server) -> Url {
    Url::parse(&server.url()).expect("mockito URL should parse")
}

/// Agent for `store_name` over the given storage, fetching from `origin`.
pub fn agent(
    storage: Arc<dyn CacheStorage>,
    origin: Url,
    store_name: &str,
    manifest: &[&str],
) -> CacheAgent {
    let fetcher = http_fetcher();
    CacheAgent::new(
        store_name,
        Manifest::new(manifest.iter().copied()),
        StoreInitializer::new(Arc::clone(&storage), Arc::clone(&fetcher), origin),
        RequestInterceptor::new(storage, fetcher),
    )
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
