//! Clock abstraction for timers and staleness arithmetic
//!
//! Production code injects `TokioClock`; tests inject a manually advanced clock
//! (`testing::mocks::ManualClock`) so reconnect backoff and staleness behavior
//! can be driven without wall-clock sleeps.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

/// Boxed future returned by [`Clock::sleep`]
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Time source and timer factory
///
/// A scheduled timer is the task that awaits the returned sleep future;
/// cancellation means aborting that task (or dropping the future).
pub trait Clock: Send + Sync {
    /// Current instant on this clock
    fn now(&self) -> Instant;

    /// Future that resolves once `duration` has elapsed on this clock
    fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Clock backed by `tokio::time`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokio_clock_now_is_monotonic() {
        let clock = TokioClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[tokio::test]
    async fn test_tokio_clock_sleep_waits_at_least_duration() {
        let clock = TokioClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(20)).await;

        let elapsed = clock.now() - start;
        assert!(
            elapsed >= Duration::from_millis(20),
            "Sleep returned after {elapsed:?}, expected at least 20ms"
        );
    }

    #[tokio::test]
    async fn test_tokio_clock_zero_sleep_completes() {
        let clock = TokioClock::new();
        // Must resolve promptly rather than hanging
        tokio::time::timeout(Duration::from_secs(1), clock.sleep(Duration::ZERO))
            .await
            .unwrap();
    }
}
