//! Explicit retry policy with exponential backoff.
//!
//! The operation decides, per error, whether another attempt is worthwhile
//! via a classifier returning [`RetryDisposition`].

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// How many times to try and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    /// Three attempts, waiting 2s then 4s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
        let factor = self.multiplier.saturating_pow(exponent);
        self.initial_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Abort,
}

/// Run `operation` until it succeeds, the classifier aborts, or the policy
/// is exhausted. The last error is returned on failure.
///
/// `on_retry(attempt, delay, &err)` is called before each sleep.
pub async fn retry_with_backoff<T, E, F, Fut, C, L>(
    policy: RetryPolicy,
    mut operation: F,
    mut classify: C,
    mut on_retry: L,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&E) -> RetryDisposition,
    L: FnMut(usize, Duration, &E),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if classify(&err) == RetryDisposition::Abort || attempt >= max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_after(attempt);
                on_retry(attempt, delay, &err);
                sleep(delay).await;
            }
        }
    }
}
