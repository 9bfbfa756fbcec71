//! The normalized result of every dispatch.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::DispatchError;

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    InvalidArguments,
    UpstreamUnavailable,
    UpstreamError,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::InvalidArguments => "InvalidArguments",
            Self::UpstreamUnavailable => "UpstreamUnavailable",
            Self::UpstreamError => "UpstreamError",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `error` member of a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: ErrorCode,
    pub message: String,
    /// Offending argument path, for `InvalidArguments`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&DispatchError> for EnvelopeError {
    fn from(err: &DispatchError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            field: err.field().map(str::to_string),
        }
    }
}

/// `{success, tool, data | error, timestamp, durationMs, requestId}`.
///
/// Exactly one of `data` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseEnvelope {
    pub success: bool,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub request_id: Uuid,
}

impl ApiResponseEnvelope {
    pub fn success(tool: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            tool: tool.into(),
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
            duration_ms: 0,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn failure(tool: impl Into<String>, error: EnvelopeError) -> Self {
        Self {
            success: false,
            tool: tool.into(),
            data: None,
            error: Some(error),
            timestamp: Utc::now(),
            duration_ms: 0,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn with_request_id(mut self, id: Uuid) -> Self {
        self.request_id = id;
        self
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }

    /// Pretty JSON rendering, used as MCP text content and CLI `--json` output.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":{{"code":"UpstreamError","message":"{e}"}}}}"#)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let env = ApiResponseEnvelope::success("analyze_seo", json!({"score": 87}))
            .with_duration(Duration::from_millis(42));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["tool"], "analyze_seo");
        assert_eq!(v["data"]["score"], 87);
        assert_eq!(v["durationMs"], 42);
        assert!(v.get("error").is_none());
        assert!(v["timestamp"].is_string());
        assert!(v["requestId"].is_string());
    }

    #[test]
    fn test_failure_shape() {
        let env = ApiResponseEnvelope::failure(
            "generate_flux_image",
            EnvelopeError {
                code: ErrorCode::InvalidArguments,
                message: "field 'width' is out of range".into(),
                field: Some("width".into()),
            },
        );
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"]["code"], "InvalidArguments");
        assert_eq!(v["error"]["field"], "width");
        assert!(v.get("data").is_none());
        assert_eq!(env.error_code(), Some(ErrorCode::InvalidArguments));
    }

    #[test]
    fn test_pretty_json_round_trips() {
        let env = ApiResponseEnvelope::success("get_server_status", json!("ok"));
        let parsed: ApiResponseEnvelope = serde_json::from_str(&env.to_pretty_json()).unwrap();
        assert_eq!(parsed, env);
    }
}
