//! Dispatcher: turns a tool call into exactly one envelope.
//!
//! State machine per call:
//!
//! ```text
//! Received → Validating → Validated → Executing → Succeeded
//!                 │                        │
//!                 └──────→ Rejected        └──────→ Failed
//! ```
//!
//! Lookup and validation happen before any network I/O; a rejected call never
//! reaches the executor.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::envelope::{ApiResponseEnvelope, EnvelopeError};
use super::errors::DispatchError;
use crate::config::{join_url, ProxyConfig};
use crate::tools::{
    validate, Catalog, RegistryError, RequestBody, ToolDefinition, ToolRegistry, ValidatedArguments,
};
use crate::upstream::{HttpSender, RetryingExecutor, UpstreamError, UpstreamRequest, UpstreamSender};

// ─── Types ───────────────────────────────────────────────────────────────────

/// Lifecycle of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    Validating,
    Validated,
    Rejected,
    Executing,
    Succeeded,
    Failed,
}

impl DispatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Succeeded | Self::Failed)
    }

    /// Terminal state reached by a call that ended in `err`.
    pub fn after_error(err: &DispatchError) -> Self {
        match err {
            DispatchError::NotFound { .. } | DispatchError::InvalidArguments { .. } => Self::Rejected,
            DispatchError::UpstreamUnavailable { .. }
            | DispatchError::UpstreamError { .. }
            | DispatchError::Cancelled { .. } => Self::Failed,
        }
    }
}

/// One tool invocation as received from a transport.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallRequest {
    #[serde(rename = "toolName", alias = "name", alias = "tool_name")]
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Failure to assemble a dispatcher from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Routes tool calls through lookup, validation and execution.
///
/// Cheap to clone; the registry and executor are shared behind `Arc`.
pub struct Dispatcher<S> {
    registry: Arc<ToolRegistry>,
    executor: Arc<RetryingExecutor<S>>,
    base_url: String,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            executor: Arc::clone(&self.executor),
            base_url: self.base_url.clone(),
        }
    }
}

impl Dispatcher<HttpSender> {
    /// Build a dispatcher for `catalog` against the configured upstream.
    pub fn from_config(config: &ProxyConfig, catalog: Catalog) -> Result<Self, BuildError> {
        let registry = ToolRegistry::from_catalog(catalog)?;
        let sender = HttpSender::from_config(config)?;
        let executor = RetryingExecutor::new(sender, config.retry_policy());
        Ok(Self::new(Arc::new(registry), executor, config.base_url.clone()))
    }
}

impl<S: UpstreamSender> Dispatcher<S> {
    pub fn new(
        registry: Arc<ToolRegistry>,
        executor: RetryingExecutor<S>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            executor: Arc::new(executor),
            base_url: base_url.into(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dispatch without external cancellation.
    pub async fn dispatch(&self, request: ToolCallRequest) -> ApiResponseEnvelope {
        self.dispatch_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Dispatch a call. Always returns a well-formed envelope.
    pub async fn dispatch_with_cancel(
        &self,
        request: ToolCallRequest,
        cancel: &CancellationToken,
    ) -> ApiResponseEnvelope {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            tool = %request.tool_name,
            request_id = %request_id
        );

        async move {
            let started = Instant::now();
            let tool = request.tool_name.clone();

            let envelope = match self.run(request, cancel).await {
                Ok(data) => {
                    transition(&tool, DispatchState::Succeeded);
                    ApiResponseEnvelope::success(&tool, data)
                }
                Err(err) => {
                    let state = DispatchState::after_error(&err);
                    transition(&tool, state);
                    tracing::warn!(
                        tool = %tool,
                        state = ?state,
                        code = %err.code(),
                        error = %err,
                        "tool call did not succeed"
                    );
                    ApiResponseEnvelope::failure(&tool, EnvelopeError::from(&err))
                }
            };

            let envelope = envelope
                .with_duration(started.elapsed())
                .with_request_id(request_id);
            tracing::info!(
                success = envelope.success,
                duration_ms = envelope.duration_ms,
                "dispatch finished"
            );
            envelope
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: ToolCallRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, DispatchError> {
        let tool_name = request.tool_name.as_str();
        transition(tool_name, DispatchState::Received);

        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| DispatchError::NotFound {
                tool: tool_name.to_string(),
            })?;

        transition(tool_name, DispatchState::Validating);
        let arguments = validate(&tool.input_schema, &request.arguments).map_err(|source| {
            DispatchError::InvalidArguments {
                tool: tool.name.to_string(),
                source,
            }
        })?;
        transition(tool_name, DispatchState::Validated);

        let upstream = self.build_request(tool, arguments);
        transition(tool_name, DispatchState::Executing);

        let body = self
            .executor
            .execute(&upstream, cancel)
            .await
            .map_err(|e| DispatchError::from_upstream(tool.name, e))?;

        Ok(parse_body(body))
    }

    /// Resolve URL, method and payload for a validated call.
    pub fn build_request(&self, tool: &ToolDefinition, arguments: ValidatedArguments) -> UpstreamRequest {
        let payload = match tool.body {
            RequestBody::Arguments => Value::Object(arguments),
            RequestBody::ToolEnvelope => {
                let mut envelope = Map::with_capacity(2);
                envelope.insert("tool".into(), Value::String(tool.name.to_string()));
                envelope.insert("arguments".into(), Value::Object(arguments));
                Value::Object(envelope)
            }
        };

        UpstreamRequest {
            url: join_url(&self.base_url, tool.endpoint),
            method: tool.method,
            payload,
        }
    }
}

fn transition(tool: &str, state: DispatchState) {
    tracing::debug!(tool, state = ?state, terminal = state.is_terminal(), "dispatch state");
}

/// A 2xx body as JSON, or as a JSON string when it is not valid JSON.
fn parse_body(body: String) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ErrorCode;
    use crate::tools::HttpMethod;
    use crate::upstream::RetryPolicy;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Counts calls and always answers with a fixed body.
    #[derive(Default)]
    struct CountingSender {
        calls: AtomicU32,
    }

    #[async_trait]
    impl UpstreamSender for CountingSender {
        async fn send(&self, _request: &UpstreamRequest) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("{}".into())
        }
    }

    fn counting_dispatcher(catalog: Catalog) -> (Dispatcher<Arc<CountingSender>>, Arc<CountingSender>) {
        let sender = Arc::new(CountingSender::default());
        let registry = Arc::new(ToolRegistry::from_catalog(catalog).unwrap());
        let executor = RetryingExecutor::new(sender.clone(), RetryPolicy::default());
        (Dispatcher::new(registry, executor, "http://api.test"), sender)
    }

    /// Fails with a connection error for the first `failures` calls.
    struct FlakySender {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakySender {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl UpstreamSender for FlakySender {
        async fn send(&self, request: &UpstreamRequest) -> Result<String, UpstreamError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(UpstreamError::ConnectionFailed {
                    endpoint: request.url.clone(),
                    reason: "connection reset".into(),
                });
            }
            Ok(r#"{"status":"ok"}"#.into())
        }
    }

    fn flaky_dispatcher(failures: u32) -> (Dispatcher<Arc<FlakySender>>, Arc<FlakySender>) {
        let sender = Arc::new(FlakySender::new(failures));
        let registry = Arc::new(ToolRegistry::from_catalog(Catalog::SeoForge).unwrap());
        let executor = RetryingExecutor::new(sender.clone(), RetryPolicy::default());
        (Dispatcher::new(registry, executor, "http://api.test"), sender)
    }

    fn http_dispatcher(server: &MockServer, timeout: Duration) -> Dispatcher<HttpSender> {
        let config = ProxyConfig {
            base_url: server.uri(),
            timeout_ms: timeout.as_millis() as u64,
            base_delay_ms: 10,
            ..Default::default()
        };
        Dispatcher::from_config(&config, Catalog::SeoForge).unwrap()
    }

    #[tokio::test]
    async fn test_generate_content_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/universal-mcp/generate-content"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({
                    "title": "WordPress SEO in 2024",
                    "body": "Start with permalinks."
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = http_dispatcher(&server, Duration::from_secs(5));
        let envelope = dispatcher
            .dispatch(ToolCallRequest::new(
                "generate_content",
                json!({"topic": "WordPress SEO", "content_type": "blog_post"}),
            ))
            .await;

        assert!(envelope.success, "{envelope:?}");
        assert_eq!(envelope.tool, "generate_content");
        let data = envelope.data.as_ref().unwrap();
        assert_eq!(data["title"], "WordPress SEO in 2024");
        assert!(envelope.error.is_none());

        let received = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(sent["topic"], "WordPress SEO");
        assert_eq!(sent["language"], "en", "defaults are filled");
        assert_eq!(sent["content_type"], "blog_post");
    }

    #[tokio::test]
    async fn test_out_of_range_width_never_hits_network() {
        let server = MockServer::start().await;
        let dispatcher = http_dispatcher(&server, Duration::from_secs(5));

        let envelope = dispatcher
            .dispatch(ToolCallRequest::new(
                "generate_flux_image",
                json!({"prompt": "a lighthouse", "width": 4000}),
            ))
            .await;

        assert!(!envelope.success);
        assert_eq!(envelope.error_code(), Some(ErrorCode::InvalidArguments));
        assert_eq!(envelope.error.unwrap().field.as_deref(), Some("width"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_always_timing_out_upstream_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let dispatcher = http_dispatcher(&server, Duration::from_millis(100));
        let envelope = dispatcher
            .dispatch(ToolCallRequest::new("analyze_seo", json!({"content": "text"})))
            .await;

        assert!(!envelope.success);
        assert_eq!(envelope.error_code(), Some(ErrorCode::UpstreamUnavailable));
        assert!(envelope.error.unwrap().message.contains("3 attempt(s)"));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_non_2xx_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let dispatcher = http_dispatcher(&server, Duration::from_secs(5));
        let envelope = dispatcher
            .dispatch(ToolCallRequest::new("analyze_seo", json!({"content": "text"})))
            .await;

        assert_eq!(envelope.error_code(), Some(ErrorCode::UpstreamError));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_below_limit_succeed() {
        for failures in 0..3 {
            let (dispatcher, sender) = flaky_dispatcher(failures);
            let envelope = dispatcher
                .dispatch(ToolCallRequest::new("get_server_status", json!({})))
                .await;
            assert!(envelope.success, "{failures} failures: {envelope:?}");
            assert_eq!(envelope.data, Some(json!({"status": "ok"})));
            assert_eq!(sender.calls.load(Ordering::SeqCst), failures + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_at_limit_exhaust_retries() {
        for failures in [3, 10] {
            let (dispatcher, sender) = flaky_dispatcher(failures);
            let envelope = dispatcher
                .dispatch(ToolCallRequest::new("get_server_status", json!({})))
                .await;
            assert!(!envelope.success);
            assert_eq!(envelope.error_code(), Some(ErrorCode::UpstreamUnavailable));
            assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let (dispatcher, sender) = counting_dispatcher(Catalog::SeoForge);
        let envelope = dispatcher
            .dispatch(ToolCallRequest::new("publish_to_myspace", json!({})))
            .await;
        assert_eq!(envelope.error_code(), Some(ErrorCode::NotFound));
        assert_eq!(envelope.tool, "publish_to_myspace");
        assert_eq!(
            envelope.error.as_ref().unwrap().message,
            "unknown tool: 'publish_to_myspace'"
        );
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_required_field_makes_no_call() {
        let (dispatcher, sender) = counting_dispatcher(Catalog::SeoForge);
        let envelope = dispatcher
            .dispatch(ToolCallRequest::new("generate_flux_image", json!({"width": 512})))
            .await;
        let error = envelope.error.unwrap();
        assert_eq!(error.code, ErrorCode::InvalidArguments);
        assert_eq!(error.field.as_deref(), Some("prompt"));
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch() {
        let (dispatcher, sender) = counting_dispatcher(Catalog::SeoForge);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let envelope = dispatcher
            .dispatch_with_cancel(
                ToolCallRequest::new("get_server_status", Value::Null),
                &cancel,
            )
            .await;
        assert_eq!(envelope.error_code(), Some(ErrorCode::Cancelled));
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unified_catalog_wraps_tool_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp/tools/execute"))
            .and(body_json(json!({
                "tool": "translate_thai",
                "arguments": {
                    "text": "hello",
                    "source_language": "en",
                    "target_language": "th",
                    "cultural_adaptation": true,
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("สวัสดี"))
            .expect(1)
            .mount(&server)
            .await;

        let config = ProxyConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        let dispatcher = Dispatcher::from_config(&config, Catalog::Unified).unwrap();
        let envelope = dispatcher
            .dispatch(ToolCallRequest::new("translate_thai", json!({"text": "hello"})))
            .await;
        assert!(envelope.success, "{envelope:?}");
        assert_eq!(envelope.data, Some(json!("สวัสดี")), "non-JSON body becomes a string");
    }

    #[test]
    fn test_build_request_get() {
        let (dispatcher, _) = counting_dispatcher(Catalog::SeoForge);
        let tool = dispatcher.registry().lookup("get_server_status").unwrap();
        let req = dispatcher.build_request(tool, Map::new());
        assert_eq!(req.url, "http://api.test/universal-mcp/status");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.payload, json!({}));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(r#"{"a":1}"#.into()), json!({"a": 1}));
        assert_eq!(parse_body("plain text".into()), json!("plain text"));
        assert_eq!(parse_body("  ".into()), Value::Null);
    }

    #[test]
    fn test_tool_call_request_aliases() {
        let a: ToolCallRequest = serde_json::from_value(json!({"name": "chat"})).unwrap();
        let b: ToolCallRequest =
            serde_json::from_value(json!({"toolName": "chat", "arguments": {"message": "hi"}})).unwrap();
        assert_eq!(a.tool_name, "chat");
        assert_eq!(a.arguments, Value::Null);
        assert_eq!(b.arguments["message"], "hi");
    }

    #[test]
    fn test_error_states() {
        let rejected = DispatchError::NotFound { tool: "x".into() };
        assert_eq!(DispatchState::after_error(&rejected), DispatchState::Rejected);

        let failed = DispatchError::Cancelled { tool: "x".into() };
        assert_eq!(DispatchState::after_error(&failed), DispatchState::Failed);

        let unavailable = DispatchError::UpstreamUnavailable {
            tool: "x".into(),
            attempts: Some(3),
            reason: "down".into(),
        };
        assert!(DispatchState::after_error(&unavailable).is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(DispatchState::Rejected.is_terminal());
        assert!(DispatchState::Succeeded.is_terminal());
        assert!(!DispatchState::Executing.is_terminal());
    }
}
