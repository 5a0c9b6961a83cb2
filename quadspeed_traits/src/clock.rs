use std::time::{Duration, Instant};

/// Wall-clock pacing for the estimation loop and the simulated sensor.
///
/// The estimator is not driven by edges: it wakes once per update period,
/// so all it needs is a monotonic `now` and a way to wait for the next
/// deadline. Tick arithmetic on the sensor side goes through `TickSource`
/// instead.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Wait until `deadline`. Returns false without waiting when it has
    /// already passed.
    fn sleep_until(&self, deadline: Instant) -> bool {
        let now = self.now();
        if deadline <= now {
            return false;
        }
        self.sleep(deadline - now);
        true
    }
}

/// `std::time::Instant` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Virtual time: `sleep` advances it instantly. Clones share one timeline,
    /// so a test can hand a clone to the code under test and read it back.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset_ns: Arc<AtomicU64>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset_ns: Arc::new(AtomicU64::new(0)),
            }
        }

        pub fn advance(&self, d: Duration) {
            let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
            // saturating add without a lock
            let _ = self
                .offset_ns
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                    Some(cur.saturating_add(ns))
                });
        }

        /// Virtual time since construction.
        pub fn elapsed(&self) -> Duration {
            Duration::from_nanos(self.offset_ns.load(Ordering::Acquire))
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn sleep_advances_without_blocking() {
            let c = TestClock::new();
            let t0 = c.now();
            c.sleep(Duration::from_secs(3600));
            assert_eq!(c.now() - t0, Duration::from_secs(3600));
        }

        #[test]
        fn sleep_until_skips_past_deadlines() {
            let c = TestClock::new();
            let deadline = c.now() + Duration::from_millis(10);
            assert!(c.sleep_until(deadline));
            assert_eq!(c.elapsed(), Duration::from_millis(10));
            assert!(!c.sleep_until(deadline));
            assert_eq!(c.elapsed(), Duration::from_millis(10));
        }

        #[test]
        fn clones_share_time() {
            let c = TestClock::new();
            let other = c.clone();
            other.advance(Duration::from_millis(7));
            assert_eq!(c.elapsed(), Duration::from_millis(7));
        }
    }
}
