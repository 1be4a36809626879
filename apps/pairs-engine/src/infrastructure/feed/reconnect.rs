//! Reconnection Backoff
//!
//! Exponential backoff with optional jitter between feed connection attempts.
//! Feed failures are always treated as transient, so there is no attempt
//! limit: the consumer retries until it is stopped.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::FeedSettings;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first retry, and the floor after a reset.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%). Zero disables it.
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl ReconnectConfig {
    /// Backoff taken from the feed settings.
    #[must_use]
    pub const fn from_feed_settings(settings: &FeedSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: settings.reconnect_jitter,
        }
    }

    /// Same backoff without jitter.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }
}

/// Backoff state for one consumer.
///
/// The base delay for failure `n` (counting from zero) is
/// `initial_delay · multiplier^n`, capped at `max_delay`; jitter scales it by
/// a uniform factor in `1 ± jitter_factor`.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    failures: u32,
}

impl ReconnectPolicy {
    /// Policy with no failures recorded.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay(self.failures);
        self.failures = self.failures.saturating_add(1);
        self.jittered(base)
    }

    /// Forget past failures after a successful connection.
    pub const fn reset(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.failures
    }

    fn base_delay(&self, failures: u32) -> Duration {
        let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
        let secs = self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map_or(self.config.max_delay, |d| d.min(self.config.max_delay))
    }

    fn jittered(&self, base: Duration) -> Duration {
        let spread = self.config.jitter_factor;
        if !spread.is_finite() || spread <= 0.0 {
            return base;
        }
        let spread = spread.min(1.0);
        let factor = rand::rng().random_range((1.0 - spread)..=(1.0 + spread));
        base.mul_f64(factor).max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> ReconnectConfig {
        ReconnectConfig::default().without_jitter()
    }

    #[test]
    fn default_is_one_second_doubling_to_thirty() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!((config.multiplier - 2.0).abs() < f64::EPSILON);
        assert!((config.jitter_factor - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn doubles_then_caps() {
        let mut policy = ReconnectPolicy::new(no_jitter());
        let delays: Vec<u64> = (0..8).map(|_| policy.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
        assert_eq!(policy.attempt_count(), 8);
    }

    #[test]
    fn reset_returns_to_floor() {
        let mut policy = ReconnectPolicy::new(no_jitter());
        assert_eq!(policy.next_delay(), Duration::from_secs(1));
        assert_eq!(policy.next_delay(), Duration::from_secs(2));
        policy.reset();
        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_band() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        let first = policy.next_delay();
        let second = policy.next_delay();
        assert!(first >= Duration::from_millis(900) && first <= Duration::from_millis(1_100));
        assert!(second >= Duration::from_millis(1_800) && second <= Duration::from_millis(2_200));
    }

    #[test]
    fn huge_multiplier_saturates_at_cap() {
        let config = ReconnectConfig {
            multiplier: 1e300,
            ..no_jitter()
        };
        let mut policy = ReconnectPolicy::new(config);
        assert_eq!(policy.next_delay(), Duration::from_secs(1));
        for _ in 0..5 {
            assert_eq!(policy.next_delay(), Duration::from_secs(30));
        }
    }
}
