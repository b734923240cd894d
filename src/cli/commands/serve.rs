//! Implementation of the `precache serve` command.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::sync::Arc;
use tracing::info;

use super::{build_fetcher, open_storage};
use crate::adapters::memory::InMemoryCacheStorage;
use crate::adapters::proxy::{InterceptServer, InterceptServerConfig};
use crate::domain::models::Config;
use crate::domain::ports::CacheStorage;
use crate::infrastructure::config::ConfigLoader;
use crate::services::CacheAgent;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to (overrides proxy.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides proxy.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Keep the store in memory instead of the database
    #[arg(long)]
    pub ephemeral: bool,
}

pub async fn execute(args: ServeArgs, config: &Config) -> Result<()> {
    let origin = ConfigLoader::origin(config)?;

    let storage: Arc<dyn CacheStorage> = if args.ephemeral {
        Arc::new(InMemoryCacheStorage::new())
    } else {
        open_storage(config).await?
    };

    let agent = Arc::new(CacheAgent::from_config(config, origin.clone(), storage, build_fetcher(config)?));

    // The proxy only binds once the store is populated.
    let report = agent
        .activate()
        .await
        .with_context(|| format!("Failed to activate store '{}'", agent.store_name()))?;
    info!(store = %report.store_name, entries = report.entries, bytes = report.bytes, "cache agent active");

    let mut server_config = InterceptServerConfig::from(&config.proxy);
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }

    InterceptServer::new(server_config, agent, origin)
        .serve_with_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!("Intercepting proxy failed: {e}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
