//! Precache CLI entry point.

use clap::Parser;

use precache::cli::{execute, handle_error, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = execute(cli).await {
        handle_error(err, json);
    }
}
