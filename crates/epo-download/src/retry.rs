//! Retry with exponential backoff.
//!
//! The per-file download action is wrapped in at most `min(max_retries, 10)`
//! retries with an exponential delay starting at 5 ms. Cancellation is never
//! retried; the `when` predicate lets it fall straight through.

use crate::error::{FetchError, Result};
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_DELAY: Duration = Duration::from_millis(5);
const RETRY_CAP: u32 = 10;

/// Execute a fallible operation with retry and exponential backoff.
///
/// # Errors
/// Returns the last error after all retries are exhausted, or the first
/// non-retryable error.
pub async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let backoff = ExponentialBuilder::default()
        .with_min_delay(BASE_DELAY)
        .with_max_times(max_retries.min(RETRY_CAP) as usize)
        .with_jitter();

    operation
        .retry(backoff)
        .when(|e: &FetchError| {
            let should_retry = e.is_retryable();
            if !should_retry {
                debug!(error = %e, "not retrying");
            }
            should_retry
        })
        .notify(|e: &FetchError, dur: Duration| {
            warn!(error = %e, delay = ?dur, "attempt failed, retrying");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn immediate_success() {
        let result: Result<i32> = with_retry(3, || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn eventual_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32> = with_retry(3, || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            async move {
                if attempt < 2 {
                    Err(FetchError::Status {
                        url: "u".into(),
                        status: 500,
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32> = with_retry(2, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            async {
                Err(FetchError::Network {
                    url: "u".into(),
                    message: "reset".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Network { .. })));
        // initial attempt + 2 retries
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn cancellation_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<i32> = with_retry(5, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            async { Err(FetchError::Cancelled) }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }
}
