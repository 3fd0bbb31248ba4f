//! Retry timer for lock acquisition loops.

use std::thread;
use std::time::{Duration, Instant};

/// Tracks how long a lock acquisition has been waiting.
///
/// A `None` timeout never expires. A zero timeout expires immediately, which
/// gives the caller exactly one attempt.
#[derive(Debug, Clone)]
pub struct TimeoutTimer {
    timeout: Option<Duration>,
    sleep: Duration,
    start: Instant,
}

impl TimeoutTimer {
    /// Create a timer and start it.
    pub fn start(timeout: Option<Duration>, sleep: Duration) -> Self {
        Self {
            timeout,
            sleep,
            start: Instant::now(),
        }
    }

    pub fn timed_out(&self) -> bool {
        self.timeout
            .is_some_and(|timeout| self.start.elapsed() >= timeout)
    }

    /// Return `true` if the timer expired, otherwise sleep one interval and
    /// return `false`.
    pub fn timed_out_or_sleep(&self) -> bool {
        if self.timed_out() {
            return true;
        }
        if !self.sleep.is_zero() {
            thread::sleep(self.sleep);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_timeout_never_expires() {
        let timer = TimeoutTimer::start(None, Duration::ZERO);
        assert!(!timer.timed_out());
        assert!(!timer.timed_out_or_sleep());
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let timer = TimeoutTimer::start(Some(Duration::ZERO), Duration::from_secs(60));
        assert!(timer.timed_out());
        // Must not sleep when already expired.
        assert!(timer.timed_out_or_sleep());
    }

    #[test]
    fn short_timeout_expires_after_sleeping() {
        let timer =
            TimeoutTimer::start(Some(Duration::from_millis(30)), Duration::from_millis(10));
        let mut rounds = 0;
        while !timer.timed_out_or_sleep() {
            rounds += 1;
            assert!(rounds < 1000, "timer never expired");
        }
        assert!(timer.start.elapsed() >= Duration::from_millis(30));
    }
}
