//! Exponential backoff policy for synthesis retries.

use std::time::Duration;

use crate::config::SynthesisSettings;

/// Attempt ceiling plus exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed per segment, first try included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Growth factor per further attempt.
    pub multiplier: f64,
    /// Cap for a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// `base * multiplier^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.base_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Whether another attempt is allowed after `attempt` attempts were made.
    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl From<&SynthesisSettings> for RetryPolicy {
    fn from(settings: &SynthesisSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            multiplier: settings.backoff_multiplier,
            max_delay: Duration::from_millis(settings.backoff_max_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SynthesisSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn delays_are_capped() {
        let policy = RetryPolicy {
            max_attempts: 50,
            base_delay: Duration::from_millis(500),
            multiplier: 3.0,
            max_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_after(10), Duration::from_secs(2));
        assert_eq!(policy.delay_after(1000), Duration::from_secs(2));
    }

    #[test]
    fn attempt_ceiling() {
        let policy = RetryPolicy::from(&SynthesisSettings::default());
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.allows_another(2));
        assert!(!policy.allows_another(3));
        assert!(!RetryPolicy::no_retry().allows_another(1));
    }
}
