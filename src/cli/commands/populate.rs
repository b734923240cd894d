//! Implementation of the `precache populate` command.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::{build_fetcher, open_storage};
use crate::cli::output::{format_bytes, output, CommandOutput};
use crate::domain::models::{Config, Manifest};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{InitReport, StoreInitializer};

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";

#[derive(Args, Debug)]
pub struct PopulateArgs {
    /// Store name (defaults to the configured store_name)
    #[arg(long)]
    pub store: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct PopulateOutput {
    pub success: bool,
    pub origin: String,
    #[serde(flatten)]
    pub report: InitReport,
}

impl CommandOutput for PopulateOutput {
    fn to_human(&self) -> String {
        format!(
            "Populated store '{}' from {}\n  Entries: {}\n  Size: {}",
            self.report.store_name,
            self.origin,
            self.report.entries,
            format_bytes(self.report.bytes)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: PopulateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let origin = ConfigLoader::origin(config)?;
    let store_name = args.store.unwrap_or_else(|| config.store_name.clone());
    let manifest = Manifest::new(config.manifest.iter().cloned());

    let initializer = StoreInitializer::new(open_storage(config).await?, build_fetcher(config)?, origin.clone())
        .with_max_concurrency(config.initializer.max_concurrency);

    let progress = if json_mode {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(manifest.len() as u64);
        pb.set_style(ProgressStyle::default_bar().template(PROGRESS_TEMPLATE)?.progress_chars("█▓▒░ "));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let result = initializer
        .initialize_with_progress(&store_name, &manifest, |key| {
            progress.set_message(key.to_string());
            progress.inc(1);
        })
        .await;
    progress.finish_and_clear();

    let report = result.with_context(|| format!("Failed to populate store '{store_name}'"))?;

    output(
        &PopulateOutput {
            success: true,
            origin: origin.to_string(),
            report,
        },
        json_mode,
    );
    Ok(())
}
