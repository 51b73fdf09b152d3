//! HTTP POST with automatic retry and exponential backoff.
//!
//! Only transient failures are retried: transport errors (connect, timeout,
//! reset, a body cut off mid-transfer) and `429 Too Many Requests`. Any other
//! non-2xx status fails on the spot.

use crate::{metrics, upstream::UpstreamError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Default number of fetch attempts (1 initial + 2 retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry; doubles on each subsequent one.
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 1000;

/// Configuration for [`post_json_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts (minimum 1; 0 is treated as 1).
    pub max_attempts: u32,
    /// Sleep before the first retry. Attempt `n` waits `base_backoff * 2^(n-1)`.
    pub base_backoff: Duration,
    /// Optional per-request timeout applied to each individual attempt.
    ///
    /// When `None`, the client's own timeout applies.
    pub timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
            timeout: None,
        }
    }
}

impl RetryConfig {
    /// Delay to sleep after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1 << exponent)
    }
}

/// Outcome of a single attempt, before the retry decision.
enum Attempt {
    Done(Vec<u8>),
    Retryable(UpstreamError),
    Fatal(UpstreamError),
}

async fn attempt(request: RequestBuilder) -> Attempt {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return Attempt::Retryable(UpstreamError::Transport(e)),
    };

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Attempt::Retryable(UpstreamError::Status(status));
    }
    if !status.is_success() {
        return Attempt::Fatal(UpstreamError::Status(status));
    }

    match response.bytes().await {
        Ok(body) => Attempt::Done(body.to_vec()),
        Err(e) => Attempt::Retryable(UpstreamError::Transport(e)),
    }
}

/// POST a JSON body with automatic retry and exponential backoff.
///
/// Returns the body of the first successful (2xx) response, read in full
/// within the same attempt. Transient failures are
/// retried up to `config.max_attempts` in total; the last transient error is
/// returned once attempts are exhausted.
///
/// # Errors
///
/// [`UpstreamError::Status`] for a non-retryable status or a persistent 429,
/// [`UpstreamError::Transport`] when the network keeps failing.
pub async fn post_json_with_retry<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
    config: &RetryConfig,
) -> Result<Vec<u8>, UpstreamError> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt_no = 1;

    loop {
        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let err = match attempt(request).await {
            Attempt::Done(body) => return Ok(body),
            Attempt::Fatal(e) => {
                warn!(
                    "Upstream POST {} failed with non-retryable error (attempt {}/{}): {}",
                    url, attempt_no, max_attempts, e
                );
                metrics::record_upstream_error();
                return Err(e);
            }
            Attempt::Retryable(e) => e,
        };

        metrics::record_upstream_error();
        warn!(
            "Upstream POST {} failed (attempt {}/{}): {}",
            url, attempt_no, max_attempts, err
        );

        if attempt_no >= max_attempts {
            return Err(err);
        }

        let delay = config.backoff_for(attempt_no);
        warn!("Retrying upstream POST in {}ms...", delay.as_millis());
        tokio::time::sleep(delay).await;
        attempt_no += 1;
    }
}
