//! Motion planning for a single axis.
//!
//! [`MovePlan`] turns a step count (and optionally a time budget) into ramp
//! breakpoints and initial pulse widths. [`Ramp`] carries those counters
//! through the move and updates the pulse width after every microstep.

mod profile;
mod ramp;

pub use profile::{Direction, MotionParams, MotionState, MovePlan, ProfileMode, SpeedProfile};
pub use ramp::Ramp;
