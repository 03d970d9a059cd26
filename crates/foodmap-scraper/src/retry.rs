//! Retry with exponential backoff for transient browser failures.
//!
//! Only [`BrowserError::is_transient`] errors are retried. Everything else is
//! returned on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::BrowserError;

/// Runs `operation`, retrying transient errors up to `max_retries` times.
///
/// The delay before retry `n` (0-based) is `backoff_base_ms * 2^n`
/// milliseconds, so `max_retries = 3` means at most four attempts.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BrowserError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_transient() || attempt >= max_retries {
            return Err(err);
        }

        let delay_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            error = %err,
            "transient browser error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}
