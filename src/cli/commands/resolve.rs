//! Implementation of the `precache resolve` command.

use anyhow::{anyhow, Context, Result};
use clap::Args;

use super::{build_fetcher, open_storage};
use crate::cli::output::{format_bytes, list_table, output, CommandOutput};
use crate::domain::models::{normalize, Config, ResourceRequest};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{RequestInterceptor, ResponseSource};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Resource URL, absolute or relative to the configured origin
    pub url: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long)]
    pub header: Vec<String>,

    /// Store name (defaults to the configured store_name)
    #[arg(long)]
    pub store: Option<String>,

    /// Print the response body
    #[arg(long)]
    pub body: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct ResolveOutput {
    pub url: String,
    pub source: ResponseSource,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl CommandOutput for ResolveOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} ({})", self.url, self.source),
            format!("  Status: {} {}", self.status, self.status_text),
            format!("  Body: {}", format_bytes(self.body_bytes as u64)),
        ];
        if !self.headers.is_empty() {
            let mut table = list_table(&["header", "value"]);
            for (name, value) in &self.headers {
                table.add_row(vec![name.as_str(), value.as_str()]);
            }
            lines.push(table.to_string());
        }
        if let Some(body) = &self.body {
            lines.push(String::new());
            lines.push(body.clone());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid header '{raw}': expected 'Name: value'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Invalid header '{raw}': empty name"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

pub async fn execute(args: ResolveArgs, config: &Config, json_mode: bool) -> Result<()> {
    let origin = ConfigLoader::origin(config)?;
    let url = normalize(&args.url, &origin)?;

    let mut request = ResourceRequest::new(&args.method, url);
    for raw in &args.header {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }

    let store_name = args.store.unwrap_or_else(|| config.store_name.clone());
    let interceptor = RequestInterceptor::new(open_storage(config).await?, build_fetcher(config)?);
    let resolution = interceptor
        .resolve(&store_name, &request)
        .await
        .with_context(|| format!("Failed to resolve {}", request.url))?;

    let response = resolution.response;
    output(
        &ResolveOutput {
            url: request.url.to_string(),
            source: resolution.source,
            status: response.status,
            status_text: response.status_text,
            body_bytes: response.body.len(),
            body: args.body.then(|| String::from_utf8_lossy(&response.body).into_owned()),
            headers: response.headers,
        },
        json_mode,
    );
    Ok(())
}
