//! Retry policy with exponential backoff and jitter.

use crate::config::FetchSettings;
use std::time::Duration;

/// How often and how patiently a failed fetch is repeated
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a job gets at most `retries + 1` fetches
    pub retries: u32,
    pub base_ms: u64,
    pub factor: f64,
    pub jitter_percent: f64,
    pub max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_ms: 100,
            factor: 2.0,
            jitter_percent: 0.20,
            max_ms: 5000,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            retries: settings.retries,
            base_ms: settings.retry_delay_ms,
            ..Self::default()
        }
    }

    /// Retry immediately; used by tests
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            base_ms: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        use rand::Rng;

        if self.base_ms == 0 {
            return Duration::ZERO;
        }

        let exponent = retry.saturating_sub(1) as i32;
        let base = (self.base_ms as f64 * self.factor.powi(exponent)).min(self.max_ms as f64);

        let jitter_range = base * self.jitter_percent;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((base + jitter).max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            jitter_percent: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(20), Duration::from_millis(5000));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let d = policy.backoff(1).as_millis();
            assert!((80..=120).contains(&d), "{} out of range", d);
        }
    }

    #[test]
    fn test_immediate() {
        assert_eq!(RetryPolicy::immediate(2).backoff(1), Duration::ZERO);
    }
}
