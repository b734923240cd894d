//! Command-line interface.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::init::InitArgs;
use commands::populate::PopulateArgs;
use commands::resolve::ResolveArgs;
use commands::serve::ServeArgs;
use commands::store::StoreArgs;

use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};

#[derive(Parser, Debug)]
#[command(name = "precache")]
#[command(about = "Intercepting resource cache with manifest precaching", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .precache/ with a default config and database
    Init(InitArgs),

    /// Fetch every manifest resource into the configured store
    Populate(PopulateArgs),

    /// Resolve one request through the store with network fallback
    Resolve(ResolveArgs),

    /// Run the intercepting proxy
    Serve(ServeArgs),

    /// Inspect stores
    Store(StoreArgs),
}

/// Run a parsed command line.
///
/// `init` runs before any configuration exists; every other command loads
/// the configuration and installs the logger first.
pub async fn execute(cli: Cli) -> Result<()> {
    let json = cli.json;
    let command = match cli.command {
        Commands::Init(args) => return commands::init::execute(args, json).await,
        command => command,
    };

    let config = ConfigLoader::load()?;
    let _logger = LoggerImpl::init(&LogConfig::from_settings(&config.logging))?;

    match command {
        Commands::Populate(args) => commands::populate::execute(args, &config, json).await,
        Commands::Resolve(args) => commands::resolve::execute(args, &config, json).await,
        Commands::Serve(args) => commands::serve::execute(args, &config).await,
        Commands::Store(args) => commands::store::execute(args, &config, json).await,
        Commands::Init(_) => unreachable!("init is dispatched before configuration is loaded"),
    }
}

/// Print `err` in the selected format and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
