//! Exponential backoff policy shared by every retrying stage

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff
///
/// Attempt `n` (1-based) that fails transiently is followed by a sleep of
/// `initial_backoff_ms * backoff_multiplier^(n-1)`, capped at
/// `max_backoff_ms`. No sleep follows the last attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one (>= 1)
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub initial_backoff_ms: u64,

    /// Growth factor between consecutive delays (>= 1.0)
    pub backoff_multiplier: f64,

    /// Upper bound on any single delay
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Fixed delay between attempts
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: delay_ms,
            backoff_multiplier: 1.0,
            max_backoff_ms: delay_ms,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// # Examples
    ///
    /// ```
    /// use ragline_domain::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_after(1), Duration::from_millis(200));
    /// assert_eq!(policy.delay_after(2), Duration::from_millis(400));
    /// assert_eq!(policy.delay_after(10), Duration::from_millis(5_000));
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let raw = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = raw.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped.round() as u64)
    }

    /// Whether another attempt is allowed after `attempt` failures
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err("backoff_multiplier must be >= 1.0".to_string());
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err("max_backoff_ms must be >= initial_backoff_ms".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(800));
        assert_eq!(policy.delay_after(6), Duration::from_millis(5_000));
    }

    #[test]
    fn test_large_attempt_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_millis(5_000));
    }

    #[test]
    fn test_fixed_policy() {
        let policy = RetryPolicy::fixed(4, 50);
        for attempt in 1..=4 {
            assert_eq!(policy.delay_after(attempt), Duration::from_millis(50));
        }
        assert!(policy.allows_retry_after(3));
        assert!(!policy.allows_retry_after(4));
    }

    #[test]
    fn test_validation() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::none().validate().is_ok());

        let mut policy = RetryPolicy::default();
        policy.max_attempts = 0;
        assert!(policy.validate().is_err());

        let mut policy = RetryPolicy::default();
        policy.backoff_multiplier = 0.5;
        assert!(policy.validate().is_err());

        let mut policy = RetryPolicy::default();
        policy.max_backoff_ms = 10;
        assert!(policy.validate().is_err());
    }
}
