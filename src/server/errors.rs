//! MCP server error types.

use thiserror::Error;

/// Errors that end the stdio serve loop.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Reading from the input stream failed.
    #[error("failed to read request: {reason}")]
    Read { reason: String },

    /// Writing a response failed (the client probably went away).
    #[error("failed to write response: {reason}")]
    Write { reason: String },

    /// A response could not be serialized.
    #[error("failed to serialize response: {reason}")]
    Serialize { reason: String },
}
