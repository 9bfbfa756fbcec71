//! Command execution.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use seoforge_mcp::config::ProxyConfig;
use seoforge_mcp::dispatch::{ApiResponseEnvelope, Dispatcher, ToolCallRequest};
use seoforge_mcp::server::{serve_stdio, McpHandler};
use seoforge_mcp::tools::{Catalog, ToolRegistry};
use seoforge_mcp::upstream::HttpSender;

use super::output::{render_envelope, render_tools};
use super::{interactive, Cli, Commands};

/// Run the parsed command line against a resolved configuration.
pub async fn run(cli: Cli, config: ProxyConfig) -> Result<ExitCode> {
    match cli.command {
        Commands::Status
        | Commands::Generate { .. }
        | Commands::Analyze { .. }
        | Commands::Chat { .. }
        | Commands::Image { .. }
        | Commands::Blog { .. } => {
            let Some((tool, arguments)) = cli.command.client_call() else {
                anyhow::bail!("no client tool for {:?}", cli.command);
            };
            let dispatcher = Dispatcher::from_config(&config, Catalog::Client)?;
            let envelope = call_until_interrupted(&dispatcher, ToolCallRequest::new(tool, arguments)).await;
            Ok(print_envelope(&envelope, cli.json))
        }
        Commands::Call { tool, args } => {
            let arguments: Value = serde_json::from_str(&args)
                .with_context(|| format!("--args is not valid JSON: {args}"))?;
            let dispatcher = Dispatcher::from_config(&config, config.catalog)?;
            let envelope = call_until_interrupted(&dispatcher, ToolCallRequest::new(tool, arguments)).await;
            Ok(print_envelope(&envelope, cli.json))
        }
        Commands::Tools => {
            let registry = ToolRegistry::from_catalog(config.catalog)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&registry.to_mcp_tools())?);
            } else {
                println!(
                    "{} {} catalog, {} tools\n",
                    "→".green(),
                    config.catalog.to_string().bold(),
                    registry.len()
                );
                print!("{}", render_tools(&registry));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve => {
            serve(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Interactive => {
            let dispatcher = Dispatcher::from_config(&config, Catalog::Client)?;
            interactive::run(&dispatcher).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(config: &ProxyConfig) -> Result<()> {
    let dispatcher = Dispatcher::from_config(config, config.catalog)?;
    tracing::info!(
        catalog = %config.catalog,
        tools = dispatcher.registry().len(),
        base_url = %config.base_url,
        "starting MCP stdio server"
    );
    let handler = Arc::new(McpHandler::new(dispatcher, config.catalog));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    serve_stdio(handler, shutdown).await?;
    tracing::info!("MCP stdio server stopped");
    Ok(())
}

/// Dispatch one call, cancelling it on Ctrl-C.
pub async fn call_until_interrupted(
    dispatcher: &Dispatcher<HttpSender>,
    request: ToolCallRequest,
) -> ApiResponseEnvelope {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let envelope = dispatcher.dispatch_with_cancel(request, &cancel).await;
    watcher.abort();
    envelope
}

/// Print an envelope and map it to the process exit code.
pub fn print_envelope(envelope: &ApiResponseEnvelope, json: bool) -> ExitCode {
    if json {
        println!("{}", envelope.to_pretty_json());
    } else if envelope.success {
        print!("{}", render_envelope(envelope));
    } else {
        eprint!("{}", render_envelope(envelope));
    }

    if envelope.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
