//! Upstream HTTP error types.
//!
//! Each variant carries the endpoint it was raised for so log lines and
//! envelopes can name it without extra plumbing.

use thiserror::Error;

/// Maximum number of response-body bytes kept in an [`UpstreamError::HttpStatus`].
pub const MAX_ERROR_BODY: usize = 2_048;

/// Errors from a single upstream attempt or from the retry loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// Connect refused, DNS failure, reset, or any other transport failure.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The attempt did not complete within the per-attempt timeout.
    #[error("request to {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// Non-2xx response.
    #[error("HTTP {status} from {endpoint}: {body}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The caller's cancellation token fired.
    #[error("request to {endpoint} cancelled")]
    Cancelled { endpoint: String },

    /// Every attempt failed.
    #[error("{endpoint} failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        last_error: Box<UpstreamError>,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },

    /// The request could not be encoded.
    #[error("invalid request to {endpoint}: {reason}")]
    InvalidRequest { endpoint: String, reason: String },
}

impl UpstreamError {
    /// The innermost error, unwrapping [`UpstreamError::RetriesExhausted`].
    pub fn root(&self) -> &UpstreamError {
        match self {
            Self::RetriesExhausted { last_error, .. } => last_error.root(),
            other => other,
        }
    }

    /// HTTP status of the root error, if it was a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the root failure happened below HTTP (no response received).
    pub fn is_transport(&self) -> bool {
        matches!(
            self.root(),
            Self::ConnectionFailed { .. } | Self::Timeout { .. }
        )
    }

    /// Number of attempts made, when known.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// Truncate an error body on a char boundary.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
