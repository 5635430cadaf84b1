//! Exponential backoff shared by the HTTP adapters and the stream consumer

use crate::config::RetryConfig;
use crate::domain::{BridgeError, Result};
use crate::log_retry_attempt;
use std::future::Future;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based)
///
/// `initial_delay_ms * backoff_multiplier^(attempt - 1)`, capped at `max_delay_ms`.
pub fn backoff_delay(policy: &RetryConfig, attempt: usize) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let delay = policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let delay_ms = if delay.is_finite() {
        (delay as u64).min(policy.max_delay_ms)
    } else {
        policy.max_delay_ms
    };
    Duration::from_millis(delay_ms)
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `max_retries` retries have been spent
///
/// Returns the last error together with the number of attempts made.
pub async fn retry_with_backoff<F, T, Fut>(
    policy: &RetryConfig,
    operation: F,
) -> std::result::Result<T, (BridgeError, usize)>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts || !e.is_retryable() => return Err((e, attempt)),
            Err(e) => {
                let delay = backoff_delay(policy, attempt);
                log_retry_attempt!(attempt + 1, max_attempts, e);
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// [`retry_with_backoff`] for callers that only need the error
pub async fn retry_request<F, T, Fut>(policy: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(policy, operation)
        .await
        .map_err(|(e, _)| e)
}
