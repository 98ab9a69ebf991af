//! Microsecond clock collaborator.
//!
//! The pulse engine only needs a free-running microsecond counter and a way
//! to wait on it. The counter is a `u32` that wraps after ~71 minutes, so
//! elapsed time is always computed as `now.wrapping_sub(start)` and never by
//! comparing two absolute readings.

/// Waits of this many microseconds or less spin without yielding.
pub const MIN_YIELD_MICROS: u32 = 50;

/// A wrapping microsecond counter with a cooperative wait.
pub trait Clock {
    /// Current counter value in microseconds. Wraps at `u32::MAX`.
    fn now_micros(&self) -> u32;

    /// Hand control to the host's cooperative scheduler for a moment.
    ///
    /// Called once before a wait longer than [`MIN_YIELD_MICROS`]. Must return
    /// promptly; the default does nothing.
    #[inline]
    fn yield_now(&mut self) {}

    /// Block until `interval_us` microseconds have elapsed since `since`.
    ///
    /// Never returns early. A zero interval returns immediately.
    fn wait_until(&mut self, since: u32, interval_us: u32) {
        if interval_us == 0 {
            return;
        }
        if interval_us > MIN_YIELD_MICROS {
            self.yield_now();
        }
        while self.now_micros().wrapping_sub(since) < interval_us {
            core::hint::spin_loop();
        }
    }
}

#[cfg(feature = "std")]
pub use self::host::{SimClock, StdClock};

#[cfg(feature = "std")]
mod host {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Instant;

    use super::Clock;

    /// Host clock backed by [`Instant`], yielding the OS thread on long waits.
    #[derive(Debug, Clone, Copy)]
    pub struct StdClock {
        origin: Instant,
    }

    impl StdClock {
        /// Create a clock whose counter starts at zero now.
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for StdClock {
        fn now_micros(&self) -> u32 {
            // Truncation is the wrap.
            self.origin.elapsed().as_micros() as u32
        }

        fn yield_now(&mut self) {
            std::thread::yield_now();
        }
    }

    /// Simulated clock for deterministic runs on a host.
    ///
    /// Time only moves when something waits on it or [`SimClock::advance`] is
    /// called, so a wait completes instantly by jumping the counter forward.
    /// Clones share the same counter, which lets several axes and a
    /// coordinator observe one timeline.
    #[derive(Debug, Clone, Default)]
    pub struct SimClock {
        now: Rc<Cell<u32>>,
    }

    impl SimClock {
        /// Create a simulated clock at zero.
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a simulated clock starting at `start` microseconds.
        pub fn starting_at(start: u32) -> Self {
            Self {
                now: Rc::new(Cell::new(start)),
            }
        }

        /// Move time forward.
        pub fn advance(&self, micros: u32) {
            self.now.set(self.now.get().wrapping_add(micros));
        }

        /// Current simulated time.
        pub fn now(&self) -> u32 {
            self.now.get()
        }
    }

    impl Clock for SimClock {
        fn now_micros(&self) -> u32 {
            self.now.get()
        }

        fn wait_until(&mut self, since: u32, interval_us: u32) {
            if self.now.get().wrapping_sub(since) < interval_us {
                self.now.set(since.wrapping_add(interval_us));
            }
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_sim_wait_jumps_forward() {
        let mut clock = SimClock::starting_at(100);
        clock.wait_until(100, 250);
        assert_eq!(clock.now(), 350);

        // Already elapsed: no movement
        clock.wait_until(0, 10);
        assert_eq!(clock.now(), 350);
    }

    #[test]
    fn test_sim_wait_across_wrap() {
        let mut clock = SimClock::starting_at(u32::MAX - 10);
        let start = clock.now_micros();
        clock.wait_until(start, 100);
        assert_eq!(clock.now(), 89);
        assert_eq!(clock.now_micros().wrapping_sub(start), 100);
    }

    #[test]
    fn test_sim_clones_share_time() {
        let a = SimClock::new();
        let b = a.clone();
        a.advance(42);
        assert_eq!(b.now_micros(), 42);
    }

    struct Ticker {
        now: core::cell::Cell<u32>,
        yields: u32,
    }

    impl Clock for Ticker {
        fn now_micros(&self) -> u32 {
            let t = self.now.get();
            self.now.set(t.wrapping_add(1));
            t
        }

        fn yield_now(&mut self) {
            self.yields += 1;
        }
    }

    #[test]
    fn test_default_wait_spins_and_yields_once() {
        let mut clock = Ticker {
            now: core::cell::Cell::new(u32::MAX - 5),
            yields: 0,
        };
        clock.wait_until(u32::MAX - 5, 80);
        assert_eq!(clock.yields, 1);
        assert!(clock.now.get().wrapping_sub(u32::MAX - 5) >= 80);

        let now = clock.now_micros();
        clock.wait_until(now, MIN_YIELD_MICROS);
        assert_eq!(clock.yields, 1);
    }
}
