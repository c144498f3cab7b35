//! Reconnect backoff schedule.
//!
//! Multiplicative delay growth with a hard ceiling and a bounded retry
//! budget. A successful connection resets the schedule to its base; an
//! exhausted budget means the feed stops for good and the condition is
//! surfaced instead of retried forever.

use std::time::Duration;

use crate::config::FeedConfig;

/// Mutable reconnect state for one feed connection.
#[derive(Debug)]
pub struct Backoff {
    /// Delay for the next reconnect attempt.
    current_delay: Duration,
    /// Attempts consumed since the last successful connect.
    retries_used: u32,
    /// First delay after a fresh connection.
    base_delay: Duration,
    /// Growth factor applied after every attempt.
    factor: f64,
    /// Delay ceiling.
    max_delay: Duration,
    /// Attempt budget before giving up.
    max_retries: u32,
}

impl Backoff {
    /// Build a schedule from feed configuration.
    pub fn new(config: &FeedConfig) -> Self {
        let base_delay = Duration::from_millis(config.base_reconnect_delay_ms);
        Self {
            current_delay: base_delay,
            retries_used: 0,
            base_delay,
            factor: config.backoff_factor,
            max_delay: Duration::from_millis(config.max_reconnect_delay_ms),
            max_retries: config.max_retries,
        }
    }

    /// Reset to the base schedule after a successful connection.
    pub fn reset(&mut self) {
        self.current_delay = self.base_delay;
        self.retries_used = 0;
    }

    /// Claim the next reconnect delay.
    ///
    /// Returns `None` once the retry budget is exhausted; otherwise the
    /// delay to sleep, after which the stored delay has grown by the
    /// configured factor (up to the ceiling).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries_used >= self.max_retries {
            return None;
        }
        let delay = self.current_delay;
        self.retries_used += 1;
        self.current_delay = self
            .current_delay
            .mul_f64(self.factor)
            .min(self.max_delay);
        Some(delay)
    }

    /// Attempts consumed since the last successful connect.
    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_retries: u32, base_ms: u64, factor: f64, max_ms: u64) -> FeedConfig {
        FeedConfig {
            max_retries,
            base_reconnect_delay_ms: base_ms,
            backoff_factor: factor,
            max_reconnect_delay_ms: max_ms,
        }
    }

    #[test]
    fn test_delay_sequence_grows_by_factor() {
        let mut backoff = Backoff::new(&config(5, 1000, 1.5, 300_000));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1500)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(2250)));
    }

    #[test]
    fn test_budget_exhaustion_stops_retries() {
        let mut backoff = Backoff::new(&config(2, 100, 1.5, 300_000));
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.retries_used(), 2);
    }

    #[test]
    fn test_delay_is_capped() {
        let mut backoff = Backoff::new(&config(10, 1000, 10.0, 5000));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(5000)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_reset_restores_base_schedule() {
        let mut backoff = Backoff::new(&config(3, 1000, 1.5, 300_000));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.retries_used(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
    }
}
