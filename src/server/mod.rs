//! MCP server: exposes the dispatcher as MCP tools over stdio.
//!
//! This module handles:
//! - JSON-RPC 2.0 framing (one message per line)
//! - `initialize`, `tools/list`, `tools/call` and `ping`
//! - Concurrent request handling with whole-line response writes
//! - Graceful shutdown with cancellation of in-flight calls

pub mod errors;
pub mod handler;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use errors::ServerError;
pub use handler::{envelope_to_response, McpHandler};
pub use transport::{serve, serve_stdio};
pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
