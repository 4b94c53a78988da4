// src/api/retry.rs
//! Retry policy with exponential backoff.
//!
//! The policy is an explicit value passed into the transport, not
//! hard-coded behavior: production uses the defaults, tests substitute a
//! zero-delay policy and still exercise the full attempt loop.

use crate::constants::{RETRY_BASE_DELAY_MS, RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_MS};
use rand::Rng;
use std::time::Duration;

/// Backoff configuration for transient failures.
///
/// Which error kinds count as transient is the error type's own vocabulary
/// (`ClientError::is_retryable`); the policy decides how often and how long
/// to wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy for tests: same attempt accounting, no sleeping.
    pub fn zero_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Single-attempt policy: surface the first failure immediately.
    pub fn no_retries() -> Self {
        Self::zero_delay(1)
    }

    /// Backoff delay after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let delay_ms =
            (self.base_delay.as_millis() as f64) * self.backoff_multiplier.powi(exponent);

        let mut delay = Duration::from_millis(delay_ms as u64);
        if delay > self.max_delay {
            delay = self.max_delay;
        }

        // Spread concurrent retries out so they don't stampede the service.
        if self.jitter && delay > Duration::ZERO {
            let factor: f64 = rand::rng().random_range(0.5..=1.5);
            delay = Duration::from_millis((delay.as_millis() as f64 * factor) as u64);
        }

        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_without_jitter() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(policy.delay_for(5), Duration::from_secs(5));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_band() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.0,
            jitter: true,
        };

        for _ in 0..50 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn zero_delay_policy_never_sleeps() {
        let policy = RetryPolicy::zero_delay(3);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(2), Duration::ZERO);
    }
}
