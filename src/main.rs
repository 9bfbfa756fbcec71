//! seoforge-mcp binary: MCP stdio server and command line client.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use cli::Cli;
use seoforge_mcp::config::ProxyConfig;
use seoforge_mcp::{init_tracing, LogOptions};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = ProxyConfig::resolve(cli.config.as_deref(), &cli.overrides())?;

    init_tracing(&LogOptions {
        level: config.log_level.clone(),
        json: cli.log_json,
        file: config.log_file.clone(),
    })?;
    tracing::debug!(
        base_url = %config.base_url,
        catalog = %config.catalog,
        timeout_ms = config.timeout_ms,
        max_retries = config.max_retries,
        "configuration resolved"
    );

    cli::run::run(cli, config).await
}
