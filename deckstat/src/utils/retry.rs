//! Retry Logic
//!
//! Bounded retry for remote catalog calls. The policy (attempt cap and delay
//! function) is kept separate from the operation being retried so it can be
//! tested on its own.

use deckstat_common::config::{BackoffKind, RetrySettings};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Delay function between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt
    Fixed(Duration),
    /// `initial + step * (attempt - 1)` after the n-th failed attempt
    Incremental { initial: Duration, step: Duration },
}

/// Attempt cap plus delay function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// Returns `None` once the attempt cap is reached: there is no delay
    /// after the final attempt.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }

        let delay = match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Incremental { initial, step } => initial + step * (attempt - 1),
        };
        Some(delay)
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        let delay = Duration::from_millis(settings.delay_ms);
        let backoff = match settings.backoff {
            BackoffKind::Fixed => Backoff::Fixed(delay),
            BackoffKind::Incremental => Backoff::Incremental {
                initial: delay,
                step: delay,
            },
        };
        RetryPolicy::new(settings.max_attempts, backoff)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are exhausted.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. On error: if attempts remain, log WARN, sleep for the policy delay, retry
/// 4. Otherwise return the last error
///
/// Every error is retried; callers that need to give up early on some
/// errors should not route them through here.
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "decklist/1234")
/// * `policy` - Attempt cap and delay function
/// * `operation` - Async closure performing one attempt
pub async fn retry<F, Fut, T, E>(operation_name: &str, policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start_time = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => match policy.delay_after(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = policy.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, will retry after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Giving up after final attempt"
                    );
                    return Err(err);
                }
            },
        }
    }
}
