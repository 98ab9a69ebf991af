//! Discrete-event scheduler interleaving several axes on one thread.

use crate::axis::Axis;
use crate::clock::Clock;
use crate::config::units::Degrees;
use crate::error::Result;

/// Largest number of axes in one group.
pub const MAX_AXES: usize = 3;

/// A group of axes driven together from one control loop.
///
/// Each axis keeps its own pulse train; the group only tracks when each one
/// is next due and calls its [`Axis::next_action`] at that moment. When
/// several axes are due at once they are serviced from the highest index
/// down, so runs are reproducible.
///
/// The group borrows the axes; it never owns their pins or clocks.
pub struct MultiAxis<'a, CLK: Clock, const N: usize> {
    /// Borrowed axes.
    axes: [&'a mut dyn Axis; N],

    /// Microseconds until each axis is due; 0 once it has finished.
    event_timers: [u32; N],

    /// Clock reading at the start of the last serviced event.
    last_action_end: u32,

    /// Microseconds from `last_action_end` to the next event.
    next_action_interval: u32,

    /// Time source shared with the axes.
    clock: CLK,
}

impl<'a, CLK: Clock, const N: usize> MultiAxis<'a, CLK, N> {
    const AXIS_COUNT_OK: () = assert!(N > 0 && N <= MAX_AXES, "a group holds 1 to 3 axes");

    /// Group `axes` under one scheduler reading `clock`.
    ///
    /// `clock` must observe the same timeline as the axes' own clocks.
    pub fn new(axes: [&'a mut dyn Axis; N], clock: CLK) -> Self {
        let () = Self::AXIS_COUNT_OK;
        Self {
            axes,
            event_timers: [0; N],
            last_action_end: 0,
            next_action_interval: 0,
            clock,
        }
    }

    /// Number of axes in the group.
    #[inline]
    pub fn len(&self) -> usize {
        N
    }

    /// Always false; a group holds at least one axis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        N == 0
    }

    /// Read access to one axis.
    pub fn axis(&self, index: usize) -> Option<&dyn Axis> {
        self.axes.get(index).map(|axis| &**axis)
    }

    /// Whether any axis still has an event pending.
    pub fn is_running(&self) -> bool {
        self.event_timers.iter().any(|&t| t != 0)
    }

    /// Start a move on every axis with a non-zero step count.
    ///
    /// Axes with 0 steps are left alone. An axis already moving has its move
    /// altered, per [`Axis::start_move`].
    pub fn start_move(&mut self, steps: [i64; N]) {
        self.start_move_within(&steps, None);
    }

    pub(crate) fn start_move_within(&mut self, steps: &[i64; N], duration_us: Option<u64>) {
        let was_running = self.is_running();
        for i in (0..N).rev() {
            if steps[i] == 0 {
                continue;
            }
            self.axes[i].start_move(steps[i], duration_us);
            if self.event_timers[i] == 0 {
                self.event_timers[i] = 1;
            }
        }
        if !was_running {
            self.last_action_end = self.clock.now_micros();
            self.next_action_interval = 1;
        }
        trace!("group start: {} axes running", self.event_timers.iter().filter(|&&t| t != 0).count());
    }

    /// Service the next due event.
    ///
    /// Waits until the earliest pending axis is due, calls
    /// [`Axis::next_action`] on every axis due at that moment (highest index
    /// first) and returns the microseconds until the next event, or 0 once
    /// every axis has finished.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn next_action(&mut self) -> Result<u32> {
        if !self.is_running() {
            self.next_action_interval = 0;
            return Ok(0);
        }

        self.clock
            .wait_until(self.last_action_end, self.next_action_interval);
        self.last_action_end = self.clock.now_micros();

        let elapsed = self.next_action_interval;
        for i in (0..N).rev() {
            if self.event_timers[i] == 0 {
                continue;
            }
            self.event_timers[i] = self.event_timers[i].saturating_sub(elapsed);
            if self.event_timers[i] == 0 {
                self.event_timers[i] = self.axes[i].next_action()?;
            }
        }

        self.next_action_interval = self
            .event_timers
            .iter()
            .copied()
            .filter(|&t| t != 0)
            .min()
            .unwrap_or(0);
        Ok(self.next_action_interval)
    }

    /// Move every axis and return when all have finished.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn move_steps(&mut self, steps: [i64; N]) -> Result<()> {
        self.start_move(steps);
        self.run()
    }

    /// Start a rotation on every axis with a non-zero angle.
    pub fn start_rotate(&mut self, degrees: [Degrees; N]) {
        let steps = self.rotation_steps(&degrees);
        self.start_move(steps);
    }

    /// Rotate every axis and return when all have finished.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn rotate(&mut self, degrees: [Degrees; N]) -> Result<()> {
        self.start_rotate(degrees);
        self.run()
    }

    /// Begin braking on every axis.
    pub fn start_brake(&mut self) {
        for axis in self.axes.iter_mut().rev() {
            axis.start_brake();
        }
    }

    /// Stop every axis now. Returns the microsteps each axis had left.
    pub fn stop(&mut self) -> [u32; N] {
        let mut left = [0; N];
        for i in (0..N).rev() {
            left[i] = self.axes[i].stop();
        }
        self.event_timers = [0; N];
        self.next_action_interval = 0;
        left
    }

    /// Request a microstep divisor on every axis. Returns the divisor each
    /// axis ended up with.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn set_microstep(&mut self, microsteps: u16) -> Result<[u16; N]> {
        let mut applied = [0; N];
        for i in (0..N).rev() {
            applied[i] = self.axes[i].set_microstep(microsteps)?;
        }
        Ok(applied)
    }

    /// Enable every axis.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn enable(&mut self) -> Result<()> {
        for axis in self.axes.iter_mut().rev() {
            axis.enable()?;
        }
        Ok(())
    }

    /// Disable every axis.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn disable(&mut self) -> Result<()> {
        for axis in self.axes.iter_mut().rev() {
            axis.disable()?;
        }
        Ok(())
    }

    pub(crate) fn rotation_steps(&self, degrees: &[Degrees; N]) -> [i64; N] {
        let mut steps = [0; N];
        for (i, deg) in degrees.iter().enumerate() {
            if deg.value() != 0.0 {
                steps[i] = self.axes[i].steps_for_rotation(*deg);
            }
        }
        steps
    }

    pub(crate) fn run(&mut self) -> Result<()> {
        while self.next_action()? != 0 {}
        Ok(())
    }
}
