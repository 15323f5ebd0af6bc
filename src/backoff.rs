use std::time::Duration;

/// Delay ladder for upstream rate limits: doubles on every throttle signal up
/// to `max_delay`, drops back to `base_delay` on the first success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffState {
    current_delay: Duration,
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffState {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        let max_delay = max_delay.max(base_delay);
        Self {
            current_delay: base_delay,
            base_delay,
            max_delay,
        }
    }

    pub fn current(&self) -> Duration {
        self.current_delay
    }

    /// Resets the ladder and returns the regular poll delay.
    pub fn on_success(&mut self) -> Duration {
        self.current_delay = self.base_delay;
        self.base_delay
    }

    /// Returns how long to wait now, then climbs one rung.
    pub fn on_rate_limited(&mut self) -> Duration {
        let wait = self.current_delay;
        self.current_delay = self
            .current_delay
            .saturating_mul(2)
            .min(self.max_delay);
        wait
    }
}
