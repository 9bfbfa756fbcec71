//! MCP method handling.
//!
//! Maps one JSON-RPC message to at most one response. `tools/call` goes
//! through the dispatcher; NotFound and InvalidArguments become JSON-RPC
//! errors carrying the envelope in `error.data`, every other outcome becomes
//! MCP text content with `isError` set from the envelope.

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::types::{
    error_codes, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, TextContent,
    ToolCallParams, PROTOCOL_VERSION, SERVER_NAME,
};
use crate::dispatch::{ApiResponseEnvelope, Dispatcher, ErrorCode, ToolCallRequest};
use crate::tools::{Catalog, CATALOG_VERSION};
use crate::upstream::UpstreamSender;

/// Stateless MCP request handler bound to one dispatcher.
pub struct McpHandler<S> {
    dispatcher: Dispatcher<S>,
    catalog: Catalog,
}

impl<S: UpstreamSender> McpHandler<S> {
    pub fn new(dispatcher: Dispatcher<S>, catalog: Catalog) -> Self {
        Self {
            dispatcher,
            catalog,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// Handle one raw input line. Returns `None` for notifications.
    pub async fn handle_line(
        &self,
        line: &str,
        cancel: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "malformed JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::new(error_codes::PARSE_ERROR, format!("parse error: {e}")),
                ));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request, cancel).await,
            Err(e) => Some(JsonRpcResponse::error(
                id.unwrap_or(Value::Null),
                JsonRpcError::new(error_codes::INVALID_REQUEST, format!("invalid request: {e}")),
            )),
        }
    }

    /// Handle one parsed request.
    pub async fn handle(
        &self,
        request: JsonRpcRequest,
        cancel: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        };

        tracing::debug!(method = %request.method, id = %id, "request received");
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                json!({ "tools": self.dispatcher.registry().to_mcp_tools() }),
            ),
            "tools/call" => self.call_tool(id, request.params, cancel).await,
            other => JsonRpcResponse::error(
                id,
                JsonRpcError::new(
                    error_codes::METHOD_NOT_FOUND,
                    format!("method not found: {other}"),
                ),
            ),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "instructions": format!(
                "SEO Forge tools ({} catalog v{CATALOG_VERSION}, {} tools) proxied to {}",
                self.catalog,
                self.dispatcher.registry().len(),
                self.dispatcher.base_url(),
            ),
        })
    }

    async fn call_tool(
        &self,
        id: Value,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(p)) => p,
            Ok(None) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(error_codes::INVALID_PARAMS, "tools/call requires params"),
                )
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(error_codes::INVALID_PARAMS, format!("invalid params: {e}")),
                )
            }
        };

        let envelope = self
            .dispatcher
            .dispatch_with_cancel(ToolCallRequest::new(params.name, params.arguments), cancel)
            .await;
        envelope_to_response(id, envelope)
    }
}

/// Map a dispatch envelope onto the JSON-RPC wire.
pub fn envelope_to_response(id: Value, envelope: ApiResponseEnvelope) -> JsonRpcResponse {
    let rpc_code = match envelope.error_code() {
        Some(ErrorCode::NotFound) => Some(error_codes::METHOD_NOT_FOUND),
        Some(ErrorCode::InvalidArguments) => Some(error_codes::INVALID_PARAMS),
        _ => None,
    };

    if let Some(code) = rpc_code {
        let message = envelope
            .error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        let data = serde_json::to_value(&envelope).unwrap_or(Value::Null);
        return JsonRpcResponse::error(id, JsonRpcError::new(code, message).with_data(data));
    }

    let result = CallToolResult {
        content: vec![TextContent::text(envelope.to_pretty_json())],
        is_error: !envelope.success,
    };
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            JsonRpcError::new(error_codes::INTERNAL_ERROR, format!("failed to encode result: {e}")),
        ),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
