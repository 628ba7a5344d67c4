//! Bounded retry loop.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms: base_delay_ms.saturating_mul(8),
        }
    }

    /// Wait before zero-based `attempt`: nothing before the first, then
    /// `base · 2^(attempt−1)` capped at `max_delay_ms`, plus up to 10% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        let capped = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        let spread = capped / 10;
        let jitter = if spread > 0 {
            rand::thread_rng().gen_range(0..spread)
        } else {
            0
        };

        Duration::from_millis(capped.saturating_add(jitter))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is exhausted.
///
/// `op` receives the zero-based attempt number. The last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        tokio::time::sleep(policy.delay(attempt)).await;

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= policy.max_attempts => {
                tracing::warn!(what, attempts = attempt + 1, error = %e, "Giving up");
                return Err(e);
            }
            Err(e) => {
                tracing::debug!(what, attempt, error = %e, "Attempt failed, retrying");
                attempt += 1;
            }
        }
    }
}
