//! Reconnect pacing.

use rand::Rng;
use std::time::Duration;

/// Pacing for repeated connection attempts.
///
/// Delays grow exponentially from [`initial_delay`](Self::initial_delay)
/// up to [`max_delay`](Self::max_delay), with each sleep jittered to
/// between 50% and 100% of its nominal value so recovering clients do
/// not stampede the feed endpoint in lockstep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts tolerated before the channel gives up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for the exponential growth.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Sets the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the delay ceiling.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Jittered delay before retry number `attempt` (1-based).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        let nominal_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exp);
        let capped_secs = nominal_secs.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::from_secs_f64(capped_secs * jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_then_cap() {
        let policy = ReconnectPolicy::default();
        for attempt in 1..=10 {
            let delay = policy.delay_for_attempt(attempt);
            let nominal = 2.0_f64.powi(i32::try_from(attempt - 1).unwrap_or(i32::MAX)).min(30.0);
            assert!(
                delay.as_secs_f64() <= nominal + f64::EPSILON,
                "attempt {attempt} exceeded nominal {nominal}s: {delay:?}"
            );
            assert!(
                delay.as_secs_f64() >= nominal * 0.5 - f64::EPSILON,
                "attempt {attempt} fell below half of nominal {nominal}s: {delay:?}"
            );
        }
    }

    #[test]
    fn first_attempt_starts_at_the_initial_delay() {
        let policy = ReconnectPolicy::default().with_initial_delay(Duration::from_millis(100));
        let delay = policy.delay_for_attempt(1);
        assert!(delay <= Duration::from_millis(100));
        assert!(delay >= Duration::from_millis(50));
    }

    #[test]
    fn builders_override_the_defaults() {
        let policy = ReconnectPolicy::default()
            .with_max_attempts(3)
            .with_max_delay(Duration::from_secs(5))
            .with_multiplier(3.0);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.max_delay, Duration::from_secs(5));
        let late = policy.delay_for_attempt(9);
        assert!(late <= Duration::from_secs(5));
    }
}
