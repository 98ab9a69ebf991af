//! Simultaneous-arrival layer on top of [`MultiAxis`].

use crate::axis::Axis;
use crate::clock::Clock;
use crate::config::units::Degrees;
use crate::error::Result;

use super::multi::MultiAxis;

/// A group whose axes start together and finish together.
///
/// Each move is timed to the slowest axis: every other axis gets a move
/// bounded to that duration and slows down to match. The axes' configured
/// speeds are not changed, so the next move starts from the same settings.
pub struct SyncAxis<'a, CLK: Clock, const N: usize> {
    group: MultiAxis<'a, CLK, N>,
}

impl<'a, CLK: Clock, const N: usize> SyncAxis<'a, CLK, N> {
    /// Group `axes` under one scheduler reading `clock`.
    pub fn new(axes: [&'a mut dyn Axis; N], clock: CLK) -> Self {
        Self {
            group: MultiAxis::new(axes, clock),
        }
    }

    /// Number of axes in the group.
    #[inline]
    pub fn len(&self) -> usize {
        self.group.len()
    }

    /// Always false; a group holds at least one axis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    /// Read access to one axis.
    pub fn axis(&self, index: usize) -> Option<&dyn Axis> {
        self.group.axis(index)
    }

    /// Whether any axis still has an event pending.
    pub fn is_running(&self) -> bool {
        self.group.is_running()
    }

    /// Predicted duration of the slowest of these moves, in microseconds.
    pub fn longest_move_us(&self, steps: &[i64; N]) -> u64 {
        steps
            .iter()
            .enumerate()
            .filter(|(_, &s)| s != 0)
            .filter_map(|(i, &s)| {
                let count = u32::try_from(s.unsigned_abs()).unwrap_or(u32::MAX);
                self.group.axis(i).map(|axis| axis.time_for_move(count))
            })
            .max()
            .unwrap_or(0)
    }

    /// Start moves that all end at the same time.
    pub fn start_move(&mut self, steps: [i64; N]) {
        let duration = self.longest_move_us(&steps);
        debug!("sync move: target {} us", duration);
        let duration = if duration > 0 { Some(duration) } else { None };
        self.group.start_move_within(&steps, duration);
    }

    /// Service the next due event. See [`MultiAxis::next_action`].
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn next_action(&mut self) -> Result<u32> {
        self.group.next_action()
    }

    /// Move every axis, finishing together, and return when done.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn move_steps(&mut self, steps: [i64; N]) -> Result<()> {
        self.start_move(steps);
        self.group.run()
    }

    /// Start rotations that all end at the same time.
    pub fn start_rotate(&mut self, degrees: [Degrees; N]) {
        let steps = self.group.rotation_steps(&degrees);
        self.start_move(steps);
    }

    /// Rotate every axis, finishing together, and return when done.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn rotate(&mut self, degrees: [Degrees; N]) -> Result<()> {
        self.start_rotate(degrees);
        self.group.run()
    }

    /// Begin braking on every axis.
    pub fn start_brake(&mut self) {
        self.group.start_brake();
    }

    /// Stop every axis now. Returns the microsteps each axis had left.
    pub fn stop(&mut self) -> [u32; N] {
        self.group.stop()
    }

    /// Request a microstep divisor on every axis.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn set_microstep(&mut self, microsteps: u16) -> Result<[u16; N]> {
        self.group.set_microstep(microsteps)
    }

    /// Enable every axis.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn enable(&mut self) -> Result<()> {
        self.group.enable()
    }

    /// Disable every axis.
    ///
    /// # Errors
    ///
    /// Returns the first pin error reported by an axis.
    pub fn disable(&mut self) -> Result<()> {
        self.group.disable()
    }
}
