//! HTTP request executor.
//!
//! [`HttpSender`] performs exactly one HTTP attempt. [`RetryingExecutor`]
//! wraps any [`UpstreamSender`] with bounded retries, exponential backoff and
//! cancellation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::errors::{truncate_body, UpstreamError};
use super::retry::{RetryPolicy, RetryState};
use crate::config::ProxyConfig;
use crate::tools::HttpMethod;

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout, independent of the per-attempt timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// `User-Agent` sent on every request.
pub const USER_AGENT: &str = concat!("seoforge-mcp/", env!("CARGO_PKG_VERSION"));

// ─── Request ─────────────────────────────────────────────────────────────────

/// A fully resolved upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub url: String,
    pub method: HttpMethod,
    /// JSON body for POST, query parameters for GET.
    pub payload: Value,
}

/// Flatten a JSON object into query parameters.
///
/// Scalars are stringified, arrays are comma-joined, nested objects are sent
/// as JSON text and `null` entries are skipped.
pub fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = payload else {
        return Vec::new();
    };

    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v {
                Value::Array(items) => items
                    .iter()
                    .map(scalar_text)
                    .collect::<Vec<_>>()
                    .join(","),
                other => scalar_text(other),
            };
            (k.clone(), rendered)
        })
        .collect()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─── UpstreamSender ──────────────────────────────────────────────────────────

/// Performs a single upstream attempt and returns the 2xx body verbatim.
#[async_trait]
pub trait UpstreamSender: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<String, UpstreamError>;
}

#[async_trait]
impl<T: UpstreamSender + ?Sized> UpstreamSender for std::sync::Arc<T> {
    async fn send(&self, request: &UpstreamRequest) -> Result<String, UpstreamError> {
        (**self).send(request).await
    }
}

/// `reqwest`-backed sender with a per-attempt timeout.
#[derive(Debug, Clone)]
pub struct HttpSender {
    http: HttpClient,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpSender {
    pub fn new(timeout: Duration, api_key: Option<String>) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::ClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        Self::new(config.timeout(), config.api_key.clone())
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout {
                endpoint: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_builder() {
            UpstreamError::InvalidRequest {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            UpstreamError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl UpstreamSender for HttpSender {
    async fn send(&self, request: &UpstreamRequest) -> Result<String, UpstreamError> {
        let url = request.url.as_str();

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(url).query(&query_pairs(&request.payload)),
            HttpMethod::Post => self.http.post(url).json(&request.payload),
        };
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key).header("X-API-Key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        if !status.is_success() {
            return Err(UpstreamError::HttpStatus {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

// ─── RetryingExecutor ────────────────────────────────────────────────────────

/// Runs upstream attempts under a [`RetryPolicy`].
///
/// Holds no per-call state, so one executor can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct RetryingExecutor<S> {
    sender: S,
    policy: RetryPolicy,
}

impl<S: UpstreamSender> RetryingExecutor<S> {
    pub fn new(sender: S, policy: RetryPolicy) -> Self {
        Self { sender, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Execute with retries.
    ///
    /// Returns the first 2xx body. A failure the policy refuses to retry is
    /// returned as-is; otherwise, once attempts run out, the last failure is
    /// wrapped in [`UpstreamError::RetriesExhausted`]. Cancellation aborts
    /// the in-flight attempt or backoff sleep and skips remaining attempts.
    pub async fn execute(
        &self,
        request: &UpstreamRequest,
        cancel: &CancellationToken,
    ) -> Result<String, UpstreamError> {
        let endpoint = request.url.as_str();
        let mut state = RetryState::new(&self.policy);

        while let Some(attempt) = state.begin_attempt() {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(endpoint, attempt)),
                res = self.sender.send(request) => res,
            };

            let err = match outcome {
                Ok(body) => {
                    tracing::info!(
                        attempt,
                        max_attempts = state.max_attempts,
                        endpoint,
                        method = %request.method,
                        outcome = "success",
                        bytes = body.len(),
                        "upstream attempt"
                    );
                    return Ok(body);
                }
                Err(e) => e,
            };

            let retriable = self.policy.should_retry(&err);
            tracing::warn!(
                attempt,
                max_attempts = state.max_attempts,
                endpoint,
                method = %request.method,
                outcome = "failure",
                retriable,
                error = %err,
                "upstream attempt"
            );

            if !retriable {
                return Err(err);
            }
            state.record_failure(err);
            if !state.has_attempts_left() {
                break;
            }

            let delay = self.policy.backoff_delay(attempt);
            tracing::debug!(delay_ms = delay.as_millis() as u64, endpoint, "backing off");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(endpoint, attempt)),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Err(state.into_exhausted(endpoint))
    }
}

fn cancelled(endpoint: &str, attempt: u32) -> UpstreamError {
    tracing::info!(endpoint, attempt, outcome = "cancelled", "upstream attempt");
    UpstreamError::Cancelled {
        endpoint: endpoint.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Fails the first `failures` calls with `error`, then succeeds.
    struct ScriptedSender {
        failures: u32,
        error: UpstreamError,
        calls: AtomicU32,
        call_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedSender {
        fn new(failures: u32, error: UpstreamError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicU32::new(0),
                call_times: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamSender for ScriptedSender {
        async fn send(&self, _request: &UpstreamRequest) -> Result<String, UpstreamError> {
            self.call_times.lock().unwrap().push(Instant::now());
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(r#"{"ok":true}"#.to_string())
            }
        }
    }

    fn timeout_error() -> UpstreamError {
        UpstreamError::Timeout {
            endpoint: "http://api.test/x".into(),
            timeout_ms: 30_000,
        }
    }

    fn request() -> UpstreamRequest {
        UpstreamRequest {
            url: "http://api.test/x".into(),
            method: HttpMethod::Post,
            payload: json!({}),
        }
    }

    fn executor(sender: Arc<ScriptedSender>, max_attempts: u32) -> RetryingExecutor<Arc<ScriptedSender>> {
        RetryingExecutor::new(
            sender,
            RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(1000),
                retry_client_errors: true,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_k_failures() {
        for k in 0..3 {
            let sender = Arc::new(ScriptedSender::new(k, timeout_error()));
            let exec = executor(sender.clone(), 3);
            let body = exec.execute(&request(), &CancellationToken::new()).await.unwrap();
            assert_eq!(body, r#"{"ok":true}"#);
            assert_eq!(sender.calls(), k + 1, "k = {k}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_after_max_attempts() {
        for k in [3, 4, 10] {
            let sender = Arc::new(ScriptedSender::new(k, timeout_error()));
            let exec = executor(sender.clone(), 3);
            let err = exec
                .execute(&request(), &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(sender.calls(), 3, "k = {k}");
            assert_eq!(err.attempts(), Some(3));
            assert_eq!(err.root(), &timeout_error());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_double() {
        let sender = Arc::new(ScriptedSender::new(10, timeout_error()));
        let exec = executor(sender.clone(), 4);
        let _ = exec.execute(&request(), &CancellationToken::new()).await;

        let times = sender.call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 4);
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        for (i, gap) in gaps.iter().enumerate() {
            let expected = Duration::from_millis(1000 * 2u64.pow(i as u32 + 1));
            assert!(
                *gap >= expected && *gap < expected + Duration::from_millis(5),
                "gap {i}: {gap:?} vs {expected:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retriable_returned_immediately() {
        let not_found = UpstreamError::HttpStatus {
            endpoint: "http://api.test/x".into(),
            status: 404,
            body: "nope".into(),
        };
        let sender = Arc::new(ScriptedSender::new(10, not_found.clone()));
        let exec = RetryingExecutor::new(
            sender.clone(),
            RetryPolicy {
                retry_client_errors: false,
                ..Default::default()
            },
        );
        let err = exec
            .execute(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, not_found);
        assert_eq!(sender.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_skips_retries() {
        let sender = Arc::new(ScriptedSender::new(10, timeout_error()));
        let exec = executor(sender.clone(), 3);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = exec.execute(&request(), &cancel).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Cancelled { .. }));
        assert_eq!(sender.calls(), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_makes_no_call() {
        let sender = Arc::new(ScriptedSender::new(0, timeout_error()));
        let exec = executor(sender.clone(), 3);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = exec.execute(&request(), &cancel).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Cancelled { .. }));
        assert_eq!(sender.calls(), 0);
    }

    #[test]
    fn test_query_pairs() {
        let pairs = query_pairs(&json!({
            "keywords": ["seo", "rust"],
            "limit": 50,
            "verbose": true,
            "filters": {"a": 1},
            "skip": null,
        }));
        let lookup = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(lookup("keywords"), Some("seo,rust"));
        assert_eq!(lookup("limit"), Some("50"));
        assert_eq!(lookup("verbose"), Some("true"));
        assert_eq!(lookup("filters"), Some(r#"{"a":1}"#));
        assert_eq!(lookup("skip"), None);
        assert!(query_pairs(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("seoforge-mcp/"));
    }

    #[tokio::test]
    async fn test_http_sender_post_json_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/universal-mcp/analyze-seo"))
            .and(header("content-type", "application/json"))
            .and(header("authorization", "Bearer k-123"))
            .and(header("x-api-key", "k-123"))
            .and(header("user-agent", USER_AGENT))
            .and(body_json(json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"score":87}"#))
            .expect(1)
            .mount(&server)
            .await;

        let sender = HttpSender::new(Duration::from_secs(5), Some("k-123".into())).unwrap();
        let body = sender
            .send(&UpstreamRequest {
                url: format!("{}/universal-mcp/analyze-seo", server.uri()),
                method: HttpMethod::Post,
                payload: json!({"content": "hello"}),
            })
            .await
            .unwrap();
        assert_eq!(body, r#"{"score":87}"#);
    }

    #[tokio::test]
    async fn test_http_sender_get_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universal-mcp/status"))
            .and(query_param("verbose", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let sender = HttpSender::new(Duration::from_secs(5), None).unwrap();
        let body = sender
            .send(&UpstreamRequest {
                url: format!("{}/universal-mcp/status", server.uri()),
                method: HttpMethod::Get,
                payload: json!({"verbose": true}),
            })
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_http_sender_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let sender = HttpSender::new(Duration::from_secs(5), None).unwrap();
        let err = sender
            .send(&UpstreamRequest {
                url: format!("{}/x", server.uri()),
                method: HttpMethod::Post,
                payload: json!({}),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(matches!(err, UpstreamError::HttpStatus { ref body, .. } if body == "overloaded"));
    }

    #[tokio::test]
    async fn test_http_sender_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let sender = HttpSender::new(Duration::from_millis(100), None).unwrap();
        let err = sender
            .send(&UpstreamRequest {
                url: format!("{}/x", server.uri()),
                method: HttpMethod::Post,
                payload: json!({}),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout { timeout_ms: 100, .. }));
    }

    #[tokio::test]
    async fn test_http_sender_connection_refused() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let sender = HttpSender::new(Duration::from_secs(2), None).unwrap();
        let err = sender
            .send(&UpstreamRequest {
                url: format!("http://127.0.0.1:{port}/x"),
                method: HttpMethod::Post,
                payload: json!({}),
            })
            .await
            .unwrap_err();
        assert!(err.is_transport(), "{err:?}");
    }
}
