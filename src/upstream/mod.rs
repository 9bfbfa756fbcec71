//! Upstream: HTTP execution against the SEO Forge API.
//!
//! This module handles:
//! - Single HTTP attempts with a per-attempt timeout (`HttpSender`)
//! - Retries with exponential backoff and cancellation (`RetryingExecutor`)
//! - Classification of transport vs. HTTP-status failures

pub mod client;
pub mod errors;
pub mod retry;

// Re-exports for convenience
pub use client::{query_pairs, HttpSender, RetryingExecutor, UpstreamRequest, UpstreamSender, USER_AGENT};
pub use errors::UpstreamError;
pub use retry::{RetryPolicy, RetryState};
