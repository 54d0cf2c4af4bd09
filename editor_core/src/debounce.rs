//! Quiet-period detection for bursts of edits.

use std::time::{Duration, Instant};

/// Tracks the time of the most recent change in a burst.
///
/// The owner calls [`touch`](Self::touch) on every change and polls
/// [`take_ready`](Self::take_ready); it fires once per burst, after `delay`
/// has passed without another touch.
#[derive(Debug, Clone, Default)]
pub struct Debounce {
    last_change: Option<Instant>,
}

impl Debounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change at `now`, restarting the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    /// Returns true if a burst is pending.
    pub fn is_armed(&self) -> bool {
        self.last_change.is_some()
    }

    /// Returns true (and disarms) when the quiet period has elapsed.
    pub fn take_ready(&mut self, now: Instant, delay: Duration) -> bool {
        match self.last_change {
            Some(at) if now.saturating_duration_since(at) >= delay => {
                self.last_change = None;
                true
            }
            _ => false,
        }
    }

    /// Drops any pending burst.
    pub fn cancel(&mut self) {
        self.last_change = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_quiet_period() {
        let delay = Duration::from_millis(300);
        let start = Instant::now();
        let mut debounce = Debounce::new();

        assert!(!debounce.take_ready(start, delay));

        debounce.touch(start);
        assert!(!debounce.take_ready(start + Duration::from_millis(100), delay));
        assert!(debounce.take_ready(start + delay, delay));
        assert!(!debounce.take_ready(start + delay * 2, delay));
    }

    #[test]
    fn test_touch_restarts_quiet_period() {
        let delay = Duration::from_millis(300);
        let start = Instant::now();
        let mut debounce = Debounce::new();

        debounce.touch(start);
        debounce.touch(start + Duration::from_millis(200));
        assert!(!debounce.take_ready(start + Duration::from_millis(400), delay));
        assert!(debounce.take_ready(start + Duration::from_millis(500), delay));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debounce = Debounce::new();
        debounce.touch(start);
        debounce.cancel();
        assert!(!debounce.is_armed());
        assert!(!debounce.take_ready(start + Duration::from_secs(1), Duration::ZERO));
    }
}
