//! Bounded retry with exponential backoff for fetch operations.
//!
//! Only the fetch goes through this wrapper. Extraction failures are not
//! transient and must never be retried.

use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Runs `operation` up to `max_attempts` times, sleeping
/// `base_delay * 2^attempt` between attempts.
///
/// Non-transient errors (missing proxy credential) short-circuit; otherwise
/// the last error is propagated unchanged once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }

                warn!("Fetch attempt {}/{} failed: {}", attempt + 1, attempts, err);

                if attempt + 1 < attempts {
                    let delay = base_delay * 2u32.pow(attempt);
                    debug!("Backing off {:?} before retry", delay);
                    sleep(delay).await;
                }

                last_error = Some(err);
            }
        }
    }

    // attempts >= 1, so at least one error was recorded
    Err(last_error.unwrap())
}
