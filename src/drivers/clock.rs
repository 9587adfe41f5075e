use std::thread;
use std::time::{Duration, Instant};
/// Time source for the acquisition loop.
///
/// The loop only ever asks "how many seconds since some fixed origin" and
/// "give up control for a moment", so a scripted clock can drive it in tests.
pub trait Clock {
    fn now_seconds(&self) -> f64;
    fn pause(&self, duration: Duration);
}
/// Wall clock backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}
impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}
impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
#[cfg(test)]
pub use manual::ManualClock;
#[cfg(test)]
mod manual {
    use super::Clock;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    /// Deterministic clock: every `pause` advances time by a fixed step,
    /// regardless of the requested duration. Clones share the same time.
    #[derive(Clone, Debug)]
    pub struct ManualClock {
        micros: Arc<AtomicU64>,
        step_micros: u64,
        // Raised by the first pause that reaches the given time.
        trip: Option<(u64, Arc<AtomicBool>)>,
    }
    impl ManualClock {
        pub fn with_step(step: Duration) -> Self {
            Self {
                micros: Arc::new(AtomicU64::new(0)),
                step_micros: step.as_micros() as u64,
                trip: None,
            }
        }
        /// Sets `flag` once a `pause` carries the clock to `at_seconds`,
        /// the way a Ctrl-C handler would from another thread.
        pub fn raising_at(mut self, at_seconds: f64, flag: Arc<AtomicBool>) -> Self {
            self.trip = Some(((at_seconds * 1_000_000.0).round() as u64, flag));
            self
        }
        pub fn advance(&self, by: Duration) {
            self.micros
                .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
        }
    }
    impl Clock for ManualClock {
        fn now_seconds(&self) -> f64 {
            self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
        }
        fn pause(&self, _duration: Duration) {
            let now = self.micros.fetch_add(self.step_micros, Ordering::SeqCst) + self.step_micros;
            if let Some((at, flag)) = &self.trip {
                if now >= *at {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn manual_clock_steps_exactly() {
        let clock = ManualClock::with_step(Duration::from_millis(100));
        let shared = clock.clone();
        for _ in 0..59 {
            clock.pause(Duration::from_millis(1));
        }
        assert_eq!(shared.now_seconds(), 5.9);
        shared.advance(Duration::from_millis(100));
        assert_eq!(clock.now_seconds(), 6.0);
    }
    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock::new();
        let before = clock.now_seconds();
        clock.pause(Duration::from_millis(2));
        assert!(clock.now_seconds() > before);
    }
}
