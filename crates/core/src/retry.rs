//! Bounded retries and call timeouts for provider requests.
//!
//! Every call that crosses a network boundary (embedding, completion) runs
//! through [`with_retries`], which applies a per-attempt timeout and retries
//! only errors that report [`AppError::is_retryable`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Retry and timeout settings for upstream calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for each later attempt
    pub initial_backoff: Duration,

    /// Upper bound for a single attempt
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that performs exactly one attempt.
    pub fn no_retries(call_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            call_timeout,
        }
    }

    /// Backoff to wait after the given (1-based) failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Run `call` under the policy's timeout, retrying transient failures.
///
/// A timed-out attempt is reported as a retryable upstream error. The last
/// error is returned once attempts are exhausted.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(policy.call_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::upstream(format!(
                "{} timed out after {:?}",
                operation, policy.call_timeout
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation,
                    attempt,
                    max_attempts,
                    backoff,
                    e
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::error!("{} failed after {} attempts: {}", operation, attempt, e);
                }
                return Err(e);
            }
        }
    }
}
