//! Retry policy and per-call retry bookkeeping.

use std::time::Duration;

use super::errors::UpstreamError;

/// How many times to try an upstream call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Retry non-2xx responses as well as transport failures.
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            retry_client_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt that follows failed attempt `failed_attempt`
    /// (1-based): `2^failed_attempt * base_delay`, saturating.
    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        2u32.checked_pow(failed_attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Whether a failed attempt may be retried at all.
    pub fn should_retry(&self, err: &UpstreamError) -> bool {
        match err {
            UpstreamError::ConnectionFailed { .. } | UpstreamError::Timeout { .. } => true,
            UpstreamError::HttpStatus { status, .. } => {
                self.retry_client_errors || !(400..500).contains(status)
            }
            UpstreamError::Cancelled { .. }
            | UpstreamError::RetriesExhausted { .. }
            | UpstreamError::ClientBuild { .. }
            | UpstreamError::InvalidRequest { .. } => false,
        }
    }
}

/// Bookkeeping for one executor call.
#[derive(Debug)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error: Option<UpstreamError>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts.max(1),
            last_error: None,
        }
    }

    /// Start the next attempt and return its 1-based number, or `None` when
    /// all attempts are used.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }

    pub fn record_failure(&mut self, err: UpstreamError) {
        self.last_error = Some(err);
    }

    /// Wrap the last failure for the caller.
    pub fn into_exhausted(self, endpoint: &str) -> UpstreamError {
        let last_error = self.last_error.unwrap_or_else(|| UpstreamError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: "no attempt was made".into(),
        });
        UpstreamError::RetriesExhausted {
            endpoint: endpoint.to_string(),
            attempts: self.attempt,
            last_error: Box::new(last_error),
        }
    }
}
