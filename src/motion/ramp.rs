//! Per-axis move counters and the per-microstep pulse update.

use super::profile::{Direction, MotionState, MovePlan, ProfileMode, SpeedProfile};

/// Runtime state of the move in flight on one axis.
///
/// [`MotionState`] is never stored; it is recomputed from the counters on
/// every query so it cannot drift from them.
#[derive(Debug, Clone)]
pub struct Ramp {
    /// Profile the current move was planned with.
    profile: SpeedProfile,

    /// Direction latched at move start.
    direction: Direction,

    /// Microsteps completed in this move.
    step_count: u32,

    /// Microsteps left; the move is over when this reaches 0.
    steps_remaining: u32,

    /// Acceleration ends when `step_count` reaches this.
    steps_to_cruise: u32,

    /// Braking starts when `steps_remaining` falls to this.
    steps_to_brake: u32,

    /// Current step period in microseconds.
    step_pulse: u32,

    /// Step period at the top of the ramp.
    cruise_step_pulse: u32,

    /// Division remainder carried into the next ramp step.
    rest: i64,
}

impl Default for Ramp {
    fn default() -> Self {
        Self::new()
    }
}

impl Ramp {
    /// An idle ramp with no move planned.
    pub const fn new() -> Self {
        Self {
            profile: SpeedProfile::constant(),
            direction: Direction::Clockwise,
            step_count: 0,
            steps_remaining: 0,
            steps_to_cruise: 0,
            steps_to_brake: 0,
            step_pulse: 0,
            cruise_step_pulse: 0,
            rest: 0,
        }
    }

    /// Reset all move-scoped counters and load a new plan.
    pub fn start(&mut self, plan: &MovePlan, direction: Direction, profile: SpeedProfile) {
        self.profile = profile;
        self.direction = direction;
        self.step_count = 0;
        self.steps_remaining = plan.steps;
        self.steps_to_cruise = plan.steps_to_cruise;
        self.steps_to_brake = plan.steps_to_brake;
        self.step_pulse = plan.step_pulse;
        self.cruise_step_pulse = plan.cruise_step_pulse;
        self.rest = 0;
    }

    /// Current phase, derived from the counters.
    pub fn state(&self) -> MotionState {
        if self.steps_remaining == 0 {
            MotionState::Stopped
        } else if self.steps_remaining <= self.steps_to_brake {
            MotionState::Decelerating
        } else if self.step_count < self.steps_to_cruise {
            MotionState::Accelerating
        } else {
            MotionState::Cruising
        }
    }

    /// Account for one completed microstep and compute the next pulse.
    ///
    /// Does nothing once the move is complete.
    pub fn advance(&mut self) {
        if self.steps_remaining == 0 {
            return;
        }
        self.steps_remaining -= 1;
        self.step_count += 1;

        if self.profile.mode != ProfileMode::Linear {
            return;
        }

        match self.state() {
            MotionState::Accelerating => {
                let denominator = 4 * self.step_count as i64 + 1;
                self.apply_ramp_step(denominator);
            }
            MotionState::Decelerating => {
                let denominator = 1 - 4 * self.steps_remaining as i64;
                self.apply_ramp_step(denominator);
            }
            MotionState::Cruising if self.step_count == self.steps_to_cruise => {
                // The series only approximates the target; land on it exactly.
                self.step_pulse = self.cruise_step_pulse;
                self.rest = 0;
            }
            _ => {}
        }
    }

    /// `c_n = c_(n-1) - (2·c_(n-1) + rest) / d`, keeping the remainder.
    fn apply_ramp_step(&mut self, denominator: i64) {
        let pulse = self.step_pulse as i64;
        let numerator = 2 * pulse + self.rest;
        let next = pulse - numerator / denominator;
        self.rest = numerator % denominator;
        self.step_pulse = u32::try_from(next.max(1)).unwrap_or(u32::MAX);
    }

    /// Add or remove steps from the move in flight.
    ///
    /// Only applies while accelerating or cruising; the move never shrinks
    /// below its braking distance. Returns whether the move was changed.
    pub fn alter(&mut self, delta: i64) -> bool {
        match self.state() {
            MotionState::Accelerating | MotionState::Cruising => {
                if delta >= 0 {
                    let extra = u32::try_from(delta).unwrap_or(u32::MAX);
                    self.steps_remaining = self.steps_remaining.saturating_add(extra);
                } else {
                    let fewer = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
                    self.steps_remaining = self
                        .steps_remaining
                        .saturating_sub(fewer)
                        .max(self.steps_to_brake);
                }
                true
            }
            MotionState::Decelerating | MotionState::Stopped => false,
        }
    }

    /// Begin braking now.
    ///
    /// While cruising the stored braking ramp starts immediately. While
    /// accelerating, the braking distance is scaled from the distance
    /// covered so far. Otherwise nothing changes.
    pub fn brake(&mut self) {
        match self.state() {
            MotionState::Cruising => {
                self.steps_remaining = self.steps_to_brake;
            }
            MotionState::Accelerating => {
                let scaled = self.step_count as f32 * self.profile.accel / self.profile.decel;
                let remaining = (scaled as u32).min(self.steps_remaining);
                self.steps_remaining = remaining;
                self.steps_to_brake = remaining;
            }
            MotionState::Decelerating | MotionState::Stopped => {}
        }
    }

    /// End the move now. Returns the microsteps that were left.
    pub fn stop(&mut self) -> u32 {
        core::mem::take(&mut self.steps_remaining)
    }

    /// Microseconds from the first STEP edge of `plan` to its last.
    ///
    /// Replays the pulse series the move will produce. The cruise phase is
    /// summed in one go, so the cost grows with the ramp lengths only.
    pub fn edge_span_us(plan: &MovePlan, profile: SpeedProfile) -> u64 {
        let mut ramp = Ramp::new();
        ramp.start(plan, Direction::Clockwise, profile);

        let mut span = 0u64;
        // The last step's period is never waited out.
        while ramp.steps_remaining > 1 {
            if ramp.state() == MotionState::Cruising {
                let flat = ramp.steps_remaining - ramp.steps_to_brake;
                if flat > 1 {
                    // Every cruise step but the one entering the brake ramp
                    let skipped = flat - 1;
                    span += skipped as u64 * ramp.step_pulse as u64;
                    ramp.step_count += skipped;
                    ramp.steps_remaining -= skipped;
                    continue;
                }
            }
            span += ramp.step_pulse as u64;
            ramp.advance();
        }
        span
    }

    /// Direction of the current move.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Microsteps completed in the current move.
    #[inline]
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Microsteps left in the current move.
    #[inline]
    pub fn steps_remaining(&self) -> u32 {
        self.steps_remaining
    }

    /// Acceleration breakpoint.
    #[inline]
    pub fn steps_to_cruise(&self) -> u32 {
        self.steps_to_cruise
    }

    /// Braking breakpoint.
    #[inline]
    pub fn steps_to_brake(&self) -> u32 {
        self.steps_to_brake
    }

    /// Period of the next step in microseconds.
    #[inline]
    pub fn step_pulse(&self) -> u32 {
        self.step_pulse
    }

    /// Period at the top of the ramp.
    #[inline]
    pub fn cruise_step_pulse(&self) -> u32 {
        self.cruise_step_pulse
    }
}
