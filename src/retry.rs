//! Retry classification and backoff computation
//!
//! The importer drives its own explicit per-record attempt loop; this module
//! holds the reusable pieces: the [`IsRetryable`] classification trait and
//! the capped exponential backoff formula, with optional jitter.

use crate::config::RetryPolicy;
use crate::error::SubmitError;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (rate limiting, server errors, network failures)
/// should return `true`. Permanent failures (validation rejections,
/// authentication problems, conflicts) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for SubmitError {
    fn is_retryable(&self) -> bool {
        match self {
            // 429 asks for a slower pace; 5xx may clear up on its own.
            // Remaining 4xx statuses are caller mistakes and will not
            // improve with repetition.
            SubmitError::Response { status, .. } => {
                *status == 429 || (500..=599).contains(status)
            }
            // No response at all: the request may never have arrived
            SubmitError::Network { .. } => true,
            // Unknown shapes are conservatively treated as permanent
            SubmitError::Other { .. } => false,
        }
    }
}

/// Backoff before retry number `attempt + 1`, where `attempt` is the 0-based
/// index of the attempt that just failed.
///
/// Grows as `base_delay * 2^attempt`, capped at `max_backoff`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base_ms = policy.base_delay.as_millis() as u64;
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor);
    Duration::from_millis(delay_ms.min(policy.max_backoff.as_millis() as u64))
}

/// Backoff with the policy's jitter setting applied
pub fn retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let delay = backoff_delay(policy, attempt);
    if policy.jitter { add_jitter(delay) } else { delay }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
