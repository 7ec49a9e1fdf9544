//! Reconnection policy for the push channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff with jitter between reconnection attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Whether to reconnect at all after the connection drops.
    pub enabled: bool,
    /// Delay before the first attempt.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Growth factor per attempt.
    pub factor: u32,
    /// Randomization, as a fraction of the computed delay (0.0 - 1.0).
    pub jitter: f64,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
            factor: 2,
            jitter: 0.5,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Limit the number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set the randomization factor.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Check whether attempt number `attempt` (0-indexed) is allowed.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.enabled && self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Calculate the delay before attempt `attempt` (0-indexed).
    ///
    /// `sample` is a uniform random number in `[0, 1)`. It picks both the
    /// size of the deviation and whether it is added or subtracted.
    pub fn delay_for_attempt(&self, attempt: u32, sample: f64) -> Duration {
        let multiplier = (self.factor as f64).powi(attempt.min(i32::MAX as u32) as i32);
        let mut ms = self.base_delay_ms as f64 * multiplier;

        if self.jitter > 0.0 {
            let sample = sample.clamp(0.0, 1.0);
            let deviation = (sample * self.jitter * ms).floor();
            if ((sample * 10.0).floor() as u64) & 1 == 0 {
                ms -= deviation;
            } else {
                ms += deviation;
            }
        }

        let ms = ms.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(ms as u64)
    }
}

/// Attempt counter driven by a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Backoff {
    /// Create a counter starting at attempt zero.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` when the policy gives up.
    pub fn next_delay(&mut self, sample: f64) -> Option<Duration> {
        if !self.policy.allows_attempt(self.attempts) {
            return None;
        }
        let delay = self.policy.delay_for_attempt(self.attempts, sample);
        self.attempts = self.attempts.saturating_add(1);
        Some(delay)
    }

    /// Start over after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
