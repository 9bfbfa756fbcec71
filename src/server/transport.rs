//! Line-delimited JSON-RPC over stdio.
//!
//! One JSON object per line in each direction. Requests are handled
//! concurrently; each response is written as a whole line under a writer
//! lock so concurrent replies never interleave.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::errors::ServerError;
use super::handler::McpHandler;
use super::types::{error_codes, JsonRpcError, JsonRpcResponse};
use crate::upstream::UpstreamSender;

/// Serve requests from `reader` until EOF or `shutdown`.
///
/// On EOF in-flight calls run to completion. On shutdown they are cancelled;
/// their `Cancelled` results are still written before returning.
pub async fn serve<S, R, W>(
    handler: Arc<McpHandler<S>>,
    reader: R,
    writer: W,
    shutdown: CancellationToken,
) -> Result<(), ServerError>
where
    S: UpstreamSender + 'static,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut tasks: JoinSet<Result<(), ServerError>> = JoinSet::new();

    tracing::info!("MCP server listening on stdio");

    loop {
        // Partial reads stay in `buf` when another branch wins.
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!(in_flight = tasks.len(), "shutdown requested");
                break;
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                log_task_outcome(joined);
                continue;
            }
            read = reader.read_until(b'\n', &mut buf) => read.map_err(|e| ServerError::Read {
                reason: e.to_string(),
            })?,
        };

        let at_eof = read == 0;
        let raw = std::mem::take(&mut buf);
        if !raw.is_empty() {
            spawn_line(&mut tasks, &handler, &writer, &shutdown, raw);
        }
        if at_eof {
            tracing::info!(in_flight = tasks.len(), "input closed");
            break;
        }
    }

    while let Some(joined) = tasks.join_next().await {
        log_task_outcome(joined);
    }
    Ok(())
}

/// Serve on the process's stdin/stdout.
pub async fn serve_stdio<S>(
    handler: Arc<McpHandler<S>>,
    shutdown: CancellationToken,
) -> Result<(), ServerError>
where
    S: UpstreamSender + 'static,
{
    serve(handler, tokio::io::stdin(), tokio::io::stdout(), shutdown).await
}

fn spawn_line<S, W>(
    tasks: &mut JoinSet<Result<(), ServerError>>,
    handler: &Arc<McpHandler<S>>,
    writer: &Arc<Mutex<W>>,
    shutdown: &CancellationToken,
    raw: Vec<u8>,
) where
    S: UpstreamSender + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let line = match String::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(error = %e, "input line is not valid UTF-8");
            let response = JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::new(error_codes::PARSE_ERROR, format!("parse error: {e}")),
            );
            let writer = Arc::clone(writer);
            tasks.spawn(async move { write_response(&writer, &response).await });
            return;
        }
    };
    if line.trim().is_empty() {
        return;
    }

    let handler = Arc::clone(handler);
    let writer = Arc::clone(writer);
    let cancel = shutdown.child_token();
    tasks.spawn(async move {
        match handler.handle_line(line.trim_end(), &cancel).await {
            Some(response) => write_response(&writer, &response).await,
            None => Ok(()),
        }
    });
}

async fn write_response<W>(writer: &Mutex<W>, response: &JsonRpcResponse) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut json = serde_json::to_string(response).map_err(|e| ServerError::Serialize {
        reason: e.to_string(),
    })?;
    json.push('\n');

    let mut writer = writer.lock().await;
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| ServerError::Write {
            reason: e.to_string(),
        })?;
    writer.flush().await.map_err(|e| ServerError::Write {
        reason: e.to_string(),
    })
}

fn log_task_outcome(joined: Result<Result<(), ServerError>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "failed to deliver response"),
        Err(e) => tracing::error!(error = %e, "request task aborted"),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
