//! Sequential retry with exponential backoff.
//!
//! Attempt `n` (from 0) that fails with a retryable error is followed by a
//! `2^n` second sleep. There is no delay cap and no jitter, so the total wait
//! is bounded only by `max_retries`.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::LlmError;

/// Delay after failed attempt `attempt` (0-based).
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

/// Run `op` up to `max_retries + 1` times.
///
/// `op` receives the 0-based attempt number. Non-retryable errors and the
/// error from the last allowed attempt are returned unchanged. Every failure
/// is logged with `operation` and the error code before it is retried or
/// returned.
///
/// # Errors
/// The error of the final attempt made.
pub async fn retry_with_backoff<T, F, Fut>(
    operation: &str,
    max_retries: u32,
    mut op: F,
) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempt = attempt + 1, "LLM call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_retryable() || attempt >= max_retries {
                    error!(
                        operation,
                        code = err.code(),
                        attempt = attempt + 1,
                        max_attempts = max_retries.saturating_add(1),
                        error = ?err,
                        "LLM call failed: {err}"
                    );
                    return Err(err);
                }

                let delay = backoff_delay(attempt);
                warn!(
                    operation,
                    code = err.code(),
                    attempt = attempt + 1,
                    max_attempts = max_retries.saturating_add(1),
                    delay_secs = delay.as_secs(),
                    error = ?err,
                    "Retrying LLM call: {err}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
