//! Implementation of the `precache store` commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use super::open_storage;
use crate::cli::output::{format_bytes, list_table, output, render_list, CommandOutput};
use crate::domain::models::{Config, StoreSummary, StoredResponse};

#[derive(Args, Debug)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub command: StoreCommands,
}

#[derive(Subcommand, Debug)]
pub enum StoreCommands {
    /// List stores with entry counts
    List,

    /// List the entries of one store
    Entries {
        /// Store name
        name: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct StoreListOutput {
    pub stores: Vec<StoreSummary>,
}

impl CommandOutput for StoreListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "entries", "created"]);
        for store in &self.stores {
            table.add_row(vec![
                store.name.clone(),
                store.entry_count.to_string(),
                store.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        render_list("store", "stores", &table, self.stores.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EntryRow {
    pub url: String,
    pub status: u16,
    pub bytes: usize,
    pub vary: Vec<String>,
    pub stored_at: String,
}

impl From<&StoredResponse> for EntryRow {
    fn from(entry: &StoredResponse) -> Self {
        Self {
            url: entry.key.to_string(),
            status: entry.response.status,
            bytes: entry.body_len(),
            vary: entry.vary.keys().cloned().collect(),
            stored_at: entry.stored_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StoreEntriesOutput {
    pub store: String,
    pub entries: Vec<EntryRow>,
}

impl CommandOutput for StoreEntriesOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["url", "status", "size", "stored"]);
        for entry in &self.entries {
            table.add_row(vec![
                entry.url.clone(),
                entry.status.to_string(),
                format_bytes(entry.bytes as u64),
                entry.stored_at.clone(),
            ]);
        }
        format!("Store '{}'\n{}", self.store, render_list("entry", "entries", &table, self.entries.len()))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: StoreArgs, config: &Config, json_mode: bool) -> Result<()> {
    let storage = open_storage(config).await?;

    match args.command {
        StoreCommands::List => {
            let stores = storage.list().await?;
            output(&StoreListOutput { stores }, json_mode);
        }
        StoreCommands::Entries { name } => {
            let Some(store) = storage.find(&name).await? else {
                bail!("Store '{name}' not found");
            };
            let entries = store.entries().await?.iter().map(EntryRow::from).collect();
            output(&StoreEntriesOutput { store: name, entries }, json_mode);
        }
    }
    Ok(())
}
