//! Dispatcher error types.
//!
//! A [`DispatchError`] is always folded into an envelope before it leaves
//! the dispatcher; it never reaches a transport adapter as an `Err`.

use thiserror::Error;

use super::envelope::ErrorCode;
use crate::tools::ValidationError;
use crate::upstream::UpstreamError;

/// Terminal failure of one dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("unknown tool: '{tool}'")]
    NotFound { tool: String },

    #[error("invalid arguments for '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        source: ValidationError,
    },

    /// No usable response: transport failures on every attempt.
    #[error("upstream unavailable for '{tool}': {reason}")]
    UpstreamUnavailable {
        tool: String,
        attempts: Option<u32>,
        reason: String,
    },

    /// The upstream answered, but never with a 2xx.
    #[error("upstream error for '{tool}': {reason}")]
    UpstreamError {
        tool: String,
        status: Option<u16>,
        attempts: Option<u32>,
        reason: String,
    },

    #[error("call to '{tool}' was cancelled")]
    Cancelled { tool: String },
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            Self::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            Self::UpstreamError { .. } => ErrorCode::UpstreamError,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
        }
    }

    /// Offending argument path, when validation failed.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidArguments { source, .. } => Some(source.field()),
            _ => None,
        }
    }

    /// Classify an executor failure by its root cause.
    pub fn from_upstream(tool: &str, err: UpstreamError) -> Self {
        let attempts = err.attempts();
        let reason = err.to_string();
        match err.root() {
            UpstreamError::Cancelled { .. } => Self::Cancelled {
                tool: tool.to_string(),
            },
            UpstreamError::HttpStatus { status, .. } => Self::UpstreamError {
                tool: tool.to_string(),
                status: Some(*status),
                attempts,
                reason,
            },
            _ => Self::UpstreamUnavailable {
                tool: tool.to_string(),
                attempts,
                reason,
            },
        }
    }
}
