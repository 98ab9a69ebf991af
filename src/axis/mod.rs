//! Single-axis STEP/DIR control.
//!
//! [`StepperAxis`] owns the pins, clock and microstep driver of one motor and
//! runs its move one microstep per [`next_action`](StepperAxis::next_action)
//! call. The [`Axis`] trait is the object-safe view of an axis used by the
//! group coordinators, so axes with different pin types can be mixed.

mod builder;
mod driver;
mod microstep;
mod pins;

pub use builder::StepperAxisBuilder;
pub use driver::StepperAxis;
pub use microstep::{
    MicrostepDriver, ModePins, ModeTable, Unwired, A4988_TABLE, DEFAULT_MAX_MICROSTEP,
    DRV8825_TABLE,
};
pub use pins::NoPin;

use crate::config::units::Degrees;
use crate::error::Result;
use crate::motion::{Direction, MotionState};

/// Object-safe interface to one axis.
pub trait Axis {
    /// Begin a move of `steps` microsteps, optionally bounded to `duration_us`.
    ///
    /// A move already in flight is altered by `steps` instead.
    fn start_move(&mut self, steps: i64, duration_us: Option<u64>);

    /// Emit the next microstep if due. Returns microseconds until the next
    /// call, or 0 once the move is complete.
    fn next_action(&mut self) -> Result<u32>;

    /// Extend or shorten the move in flight.
    fn alter_move(&mut self, steps: i64);

    /// Begin braking now.
    fn start_brake(&mut self);

    /// End the move now, returning the microsteps left.
    fn stop(&mut self) -> u32;

    /// Predicted duration of a move of `steps` microsteps.
    fn time_for_move(&self, steps: u32) -> u64;

    /// Microsteps needed to turn the shaft by `degrees`.
    fn steps_for_rotation(&self, degrees: Degrees) -> i64;

    /// Request a new microstep divisor; returns the divisor in effect.
    fn set_microstep(&mut self, microsteps: u16) -> Result<u16>;

    /// Drive the ENABLE line active.
    fn enable(&mut self) -> Result<()>;

    /// Drive the ENABLE line inactive.
    fn disable(&mut self) -> Result<()>;

    /// Phase of the move in flight.
    fn state(&self) -> MotionState;

    /// Microsteps completed in the current move.
    fn steps_completed(&self) -> u32;

    /// Microsteps left in the current move.
    fn steps_remaining(&self) -> u32;

    /// Direction of the current move.
    fn direction(&self) -> Direction;
}
