//! Reconnect delay schedule.

use std::time::Duration;

/// Exponential backoff for reconnect attempts.
///
/// Attempt `n` (1-based) waits `initial * factor^(n-1)`, capped at `max`
/// and truncated to whole milliseconds. After `max_attempts` consecutive
/// failures the client gives up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Growth factor between consecutive retries.
    pub factor: f64,
    /// Upper bound on any single delay.
    pub max: Duration,
    /// Consecutive failures tolerated before the client stops retrying.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1000),
            factor: 1.5,
            max: Duration::from_millis(30_000),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay to wait before reconnect attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.initial.as_millis() as f64 * self.factor.powi(exponent);
        let capped = raw.min(self.max.as_millis() as f64);
        Duration::from_millis(capped.floor() as u64)
    }

    /// Whether attempt `attempt` is past the limit.
    #[must_use]
    pub const fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}
