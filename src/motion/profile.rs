//! Speed profiles and move planning.
//!
//! Linear speed profile calculations follow
//! - D. Austin, "Generating stepper-motor speed profiles in real time", 2004
//! - Atmel AVR446, "Linear speed control of stepper motor", 2006

use libm::sqrtf;
use serde::Deserialize;

use super::ramp::Ramp;
use crate::config::units::Rpm;

/// Microseconds per minute, used to turn rpm into a step period.
const MICROS_PER_MINUTE: f32 = 60_000_000.0;

/// Microseconds per second.
const MICROS_PER_SEC: f32 = 1_000_000.0;

/// Correction applied to the first ramp step so the discrete series tracks
/// the continuous ramp (Austin, eq. 15).
const FIRST_STEP_CORRECTION: f32 = 0.676;

/// Refinement rounds when fitting a ramp to a requested duration.
const FIT_PASSES: usize = 4;

/// Direction of motor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Clockwise (positive step count).
    Clockwise,
    /// Counter-clockwise (negative step count).
    CounterClockwise,
}

impl Direction {
    /// Get direction from signed step count.
    #[inline]
    pub fn from_steps(steps: i64) -> Self {
        if steps >= 0 {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }
}

/// Phase of the move in flight, derived from the step counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionState {
    /// No steps remaining.
    Stopped,
    /// Speeding up toward cruise speed.
    Accelerating,
    /// Moving at constant speed.
    Cruising,
    /// Braking to a stop.
    Decelerating,
}

/// How step timing evolves over a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    /// Every step at the target speed, no ramp.
    #[default]
    Constant,
    /// Trapezoidal ramp: accelerate, cruise, decelerate.
    Linear,
}

/// Speed profile: mode plus ramp rates in full steps/s².
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeedProfile {
    /// Profile mode.
    #[serde(default)]
    pub mode: ProfileMode,

    /// Acceleration in full steps per second squared.
    #[serde(default = "default_rate")]
    pub accel: f32,

    /// Deceleration in full steps per second squared.
    #[serde(default = "default_rate")]
    pub decel: f32,
}

fn default_rate() -> f32 {
    SpeedProfile::DEFAULT_RATE
}

impl SpeedProfile {
    /// Ramp rate used when none is given.
    pub const DEFAULT_RATE: f32 = 1000.0;

    /// Constant speed profile.
    pub const fn constant() -> Self {
        Self {
            mode: ProfileMode::Constant,
            accel: Self::DEFAULT_RATE,
            decel: Self::DEFAULT_RATE,
        }
    }

    /// Linear (trapezoidal) profile with independent ramp rates.
    pub const fn linear(accel: f32, decel: f32) -> Self {
        Self {
            mode: ProfileMode::Linear,
            accel,
            decel,
        }
    }

    /// Whether the ramp rates can be used for planning.
    pub fn is_valid(&self) -> bool {
        self.mode == ProfileMode::Constant
            || (self.accel.is_finite() && self.accel > 0.0 && self.decel.is_finite() && self.decel > 0.0)
    }
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self::constant()
    }
}

/// Everything about an axis that shapes its step timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Full steps per motor revolution.
    pub motor_steps: u16,
    /// Current microstep divisor.
    pub microsteps: u16,
    /// Target cruise speed.
    pub rpm: Rpm,
    /// Speed profile.
    pub profile: SpeedProfile,
}

impl MotionParams {
    /// Nominal cruise speed in full steps per second.
    #[inline]
    pub fn full_steps_per_sec(&self) -> f32 {
        self.rpm.full_steps_per_sec(self.motor_steps)
    }

    /// Step period at the nominal speed, in microseconds.
    pub fn constant_step_pulse(&self) -> u32 {
        let per_rev = self.motor_steps as f32 * self.microsteps as f32 * self.rpm.value();
        to_micros(MICROS_PER_MINUTE / per_rev)
    }

    /// Microsteps needed to turn the shaft by `degrees`, truncated toward zero.
    pub fn steps_for_rotation(&self, degrees: f32) -> i64 {
        (degrees * self.motor_steps as f32 * self.microsteps as f32 / 360.0) as i64
    }
}

/// Breakpoints and pulses for one move, fixed when the move starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    /// Microsteps in the move.
    pub steps: u32,
    /// Microstep count at which acceleration ends.
    pub steps_to_cruise: u32,
    /// Remaining-microstep count at which braking starts.
    pub steps_to_brake: u32,
    /// Pulse of the first step, in microseconds.
    pub step_pulse: u32,
    /// Pulse at the top of the ramp, in microseconds.
    pub cruise_step_pulse: u32,
}

impl MovePlan {
    /// Plan a move of `steps` microsteps.
    ///
    /// With `duration_us` set, the speed is lowered so the move takes that
    /// long. It is never raised: a duration shorter than the move can
    /// physically take is ignored and the move runs at nominal speed.
    pub fn new(params: &MotionParams, steps: u32, duration_us: Option<u64>) -> Self {
        let duration_us = duration_us.filter(|&t| t > 0);
        match params.profile.mode {
            ProfileMode::Linear if params.profile.is_valid() => {
                Self::linear(params, steps, duration_us)
            }
            _ => Self::constant(params, steps, duration_us),
        }
    }

    fn constant(params: &MotionParams, steps: u32, duration_us: Option<u64>) -> Self {
        let cruise_step_pulse = params.constant_step_pulse();
        let mut step_pulse = cruise_step_pulse;
        if let Some(t) = duration_us {
            // n steps span n - 1 periods
            let periods = steps.saturating_sub(1) as u64;
            if periods > 0 && t > periods * cruise_step_pulse as u64 {
                step_pulse = u32::try_from(t / periods).unwrap_or(u32::MAX);
            }
        }
        Self {
            steps,
            steps_to_cruise: 0,
            steps_to_brake: 0,
            step_pulse,
            cruise_step_pulse,
        }
    }

    fn linear(params: &MotionParams, steps: u32, duration_us: Option<u64>) -> Self {
        let nominal_speed = params.full_steps_per_sec();
        let nominal = Self::linear_at(params, steps, nominal_speed);
        let Some(t) = duration_us else {
            return nominal;
        };
        if t <= nominal.duration_us(params) {
            return nominal;
        }

        // The closed form ignores the discrete series, so refit against the
        // replayed span until the two agree.
        let mut plan = nominal;
        let mut target = t as f32;
        for _ in 0..FIT_PASSES {
            let Some(speed) = Self::fit_speed(params, steps, target / MICROS_PER_SEC) else {
                break;
            };
            if speed >= nominal_speed {
                break;
            }
            plan = Self::linear_at(params, steps, speed);
            let span = plan.duration_us(params);
            if span.abs_diff(t) < plan.cruise_step_pulse as u64 {
                break;
            }
            target += t as f32 - span as f32;
        }
        debug!(
            "move stretched to {} us: pulse {} -> {}",
            t, nominal.cruise_step_pulse, plan.cruise_step_pulse
        );
        plan
    }

    /// Cruise speed in full steps/s for which the trapezoid lasts `t` seconds.
    ///
    /// Solves t = d/v + v·a2/2 for v, with a2 = 1/accel + 1/decel.
    fn fit_speed(params: &MotionParams, steps: u32, t: f32) -> Option<f32> {
        let d = steps as f32 / params.microsteps as f32;
        let a2 = 1.0 / params.profile.accel + 1.0 / params.profile.decel;
        let discriminant = t * t - 2.0 * a2 * d;
        if discriminant < 0.0 {
            return None;
        }
        let speed = (t - sqrtf(discriminant)) / a2;
        (speed > 0.0).then_some(speed)
    }

    /// Trapezoid with a cruise speed of `speed` full steps/s.
    fn linear_at(params: &MotionParams, steps: u32, speed: f32) -> Self {
        let microsteps = params.microsteps as f32;
        let accel = params.profile.accel;
        let decel = params.profile.decel;

        let mut steps_to_cruise = (microsteps * (speed * speed / (2.0 * accel))) as u32;
        let mut steps_to_brake = (steps_to_cruise as f32 * accel / decel) as u32;
        let mut peak_speed = speed;
        if (steps as u64) < steps_to_cruise as u64 + steps_to_brake as u64 {
            // Cannot reach cruise speed: ramp up, then straight back down.
            steps_to_cruise = (steps as f32 * decel / (accel + decel)) as u32;
            steps_to_cruise = steps_to_cruise.min(steps);
            steps_to_brake = steps - steps_to_cruise;
            peak_speed = sqrtf(2.0 * accel * steps_to_cruise as f32 / microsteps);
        }

        let c0 = MICROS_PER_SEC * FIRST_STEP_CORRECTION * sqrtf(2.0 / (accel * microsteps));
        let cruise_step_pulse = to_micros(MICROS_PER_SEC / (peak_speed * microsteps));
        // Slower than one ramp step: no ramp to run, start at cruise speed.
        let step_pulse = if steps_to_cruise == 0 && steps_to_brake == 0 {
            cruise_step_pulse
        } else {
            to_micros(c0)
        };
        Self {
            steps,
            steps_to_cruise,
            steps_to_brake,
            step_pulse,
            cruise_step_pulse,
        }
    }

    /// Steps spent at cruise speed.
    #[inline]
    pub fn cruise_steps(&self) -> u32 {
        self.steps
            .saturating_sub(self.steps_to_cruise)
            .saturating_sub(self.steps_to_brake)
    }

    /// Predicted duration of the move in microseconds: the time from its
    /// first STEP edge to its last.
    pub fn duration_us(&self, params: &MotionParams) -> u64 {
        Ramp::edge_span_us(self, params.profile)
    }
}

/// Convert a float duration to whole microseconds, at least 1.
fn to_micros(us: f32) -> u32 {
    if us.is_finite() && us >= 1.0 {
        if us >= u32::MAX as f32 {
            u32::MAX
        } else {
            us as u32
        }
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rpm: f32, microsteps: u16, profile: SpeedProfile) -> MotionParams {
        MotionParams {
            motor_steps: 200,
            microsteps,
            rpm: Rpm::new(rpm).unwrap(),
            profile,
        }
    }

    #[test]
    fn test_constant_pulse() {
        let p = params(60.0, 1, SpeedProfile::constant());
        assert_eq!(p.constant_step_pulse(), 5000);

        let plan = MovePlan::new(&p, 200, None);
        assert_eq!(plan.step_pulse, 5000);
        assert_eq!(plan.steps_to_cruise, 0);
        assert_eq!(plan.steps_to_brake, 0);
        // 199 periods between the first and last edge
        assert_eq!(plan.duration_us(&p), 995_000);
    }

    #[test]
    fn test_constant_stretch_only_when_longer() {
        let p = params(60.0, 1, SpeedProfile::constant());

        let stretched = MovePlan::new(&p, 100, Some(990_000));
        assert_eq!(stretched.step_pulse, 10_000);
        assert_eq!(stretched.duration_us(&p), 990_000);

        // Shorter than natural: unchanged
        let rushed = MovePlan::new(&p, 100, Some(100_000));
        assert_eq!(rushed.step_pulse, 5000);
    }

    #[test]
    fn test_linear_ramp_fits() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let plan = MovePlan::new(&p, 4000, None);

        // 600 full steps/s: 600² / 2000 = 180
        assert_eq!(plan.steps_to_cruise, 180);
        assert_eq!(plan.steps_to_brake, 180);
        assert!(plan.steps_to_cruise + plan.steps_to_brake <= 4000);
        // 10^6 / 600
        assert_eq!(plan.cruise_step_pulse, 1666);
        // 10^6 · 0.676 · sqrt(2 / 1000)
        assert!((plan.step_pulse as i64 - 30231).abs() <= 1);
    }

    #[test]
    fn test_linear_ramp_clamped() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let plan = MovePlan::new(&p, 50, None);

        assert_eq!(plan.steps_to_cruise, 25);
        assert_eq!(plan.steps_to_brake, 25);
        assert_eq!(plan.steps_to_cruise + plan.steps_to_brake, 50);
        assert_eq!(plan.cruise_steps(), 0);
        // Peak speed sqrt(2·1000·25) ≈ 223.6 steps/s
        assert!(plan.cruise_step_pulse > 1666);
    }

    #[test]
    fn test_asymmetric_ramp() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 500.0));
        let plan = MovePlan::new(&p, 4000, None);
        assert_eq!(plan.steps_to_cruise, 180);
        assert_eq!(plan.steps_to_brake, 360);

        let short = MovePlan::new(&p, 90, None);
        // decel / (accel + decel) = 1/3
        assert_eq!(short.steps_to_cruise, 30);
        assert_eq!(short.steps_to_brake, 60);
    }

    #[test]
    fn test_linear_time_bounded_slows_down() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let nominal = MovePlan::new(&p, 4000, None);
        let natural = nominal.duration_us(&p);

        let target = natural * 2;
        let slowed = MovePlan::new(&p, 4000, Some(target));
        assert!(slowed.cruise_step_pulse > nominal.cruise_step_pulse);
        assert!(slowed.steps_to_cruise < nominal.steps_to_cruise);

        let predicted = slowed.duration_us(&p);
        assert!(
            predicted.abs_diff(target) <= slowed.cruise_step_pulse as u64,
            "{} vs {}",
            predicted,
            target
        );
    }

    #[test]
    fn test_linear_time_bounded_short_move() {
        let p = params(60.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let natural = MovePlan::new(&p, 1000, None).duration_us(&p);
        let target = natural + 2_000_000;
        let slowed = MovePlan::new(&p, 1000, Some(target));
        assert!(slowed.duration_us(&p).abs_diff(target) <= slowed.cruise_step_pulse as u64);
    }

    #[test]
    fn test_slow_linear_starts_at_cruise() {
        // 10 full steps/s is slower than the first ramp step
        let p = params(3.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let plan = MovePlan::new(&p, 100, None);
        assert_eq!(plan.steps_to_cruise + plan.steps_to_brake, 0);
        assert_eq!(plan.step_pulse, 100_000);
        assert_eq!(plan.duration_us(&p), 99 * 100_000);
    }

    #[test]
    fn test_short_move_stretched_to_long_one() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let target = MovePlan::new(&p, 4000, None).duration_us(&p);
        let plan = MovePlan::new(&p, 50, Some(target));
        assert!(plan.duration_us(&p).abs_diff(target) <= plan.cruise_step_pulse as u64);
    }

    #[test]
    fn test_linear_infeasible_duration_falls_back() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let nominal = MovePlan::new(&p, 4000, None);
        let rushed = MovePlan::new(&p, 4000, Some(1000));
        assert_eq!(rushed, nominal);
    }

    #[test]
    fn test_linear_duration_replays_ramp() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        for steps in [2, 50, 361, 4000] {
            let plan = MovePlan::new(&p, steps, None);
            let mut ramp = Ramp::new();
            ramp.start(&plan, Direction::Clockwise, p.profile);
            let mut span = 0u64;
            while ramp.steps_remaining() > 1 {
                span += ramp.step_pulse() as u64;
                ramp.advance();
            }
            assert_eq!(plan.duration_us(&p), span, "{} steps", steps);
        }
    }

    #[test]
    fn test_linear_duration_counts_c0_correction() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        let plan = MovePlan::new(&p, 4000, None);
        // Continuous trapezoid: 3640 cruise periods plus two 0.6 s ramps.
        // The discrete ramps start from the corrected c0 and the final
        // period is never waited out, so the real move is shorter.
        let continuous = 3640 * 1666 + 1_200_000u64;
        let short_by = continuous - plan.duration_us(&p);
        assert!(short_by > 20_000 && short_by < 40_000, "{}", short_by);
    }

    #[test]
    fn test_single_step_has_no_span() {
        let p = params(180.0, 1, SpeedProfile::linear(1000.0, 1000.0));
        assert_eq!(MovePlan::new(&p, 1, None).duration_us(&p), 0);
        let c = params(60.0, 1, SpeedProfile::constant());
        assert_eq!(MovePlan::new(&c, 1, None).duration_us(&c), 0);
    }

    #[test]
    fn test_zero_steps() {
        let p = params(180.0, 4, SpeedProfile::linear(1000.0, 1000.0));
        let plan = MovePlan::new(&p, 0, None);
        assert_eq!(plan.steps_to_cruise + plan.steps_to_brake, 0);
        assert_eq!(plan.duration_us(&p), 0);
    }

    #[test]
    fn test_steps_for_rotation() {
        let p = params(60.0, 16, SpeedProfile::constant());
        assert_eq!(p.steps_for_rotation(90.0), 800);
        assert_eq!(p.steps_for_rotation(-360.0), -3200);
        assert_eq!(p.steps_for_rotation(0.5), 4);
    }

    #[test]
    fn test_direction() {
        assert_eq!(Direction::from_steps(10), Direction::Clockwise);
        assert_eq!(Direction::from_steps(-10), Direction::CounterClockwise);
        assert_eq!(Direction::CounterClockwise.sign(), -1);
    }
}
