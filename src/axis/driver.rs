//! STEP/DIR axis driver.
//!
//! Generic over embedded-hal 1.0 pin types, a [`Clock`] and a
//! [`MicrostepDriver`].

use embedded_hal::digital::OutputPin;

use crate::clock::Clock;
use crate::config::units::{Degrees, Rpm};
use crate::config::{AxisConfig, EnablePolarity};
use crate::error::Result;
use crate::motion::{Direction, MotionParams, MotionState, MovePlan, Ramp, SpeedProfile};

use super::microstep::{MicrostepDriver, Unwired};
use super::pins::{write, NoPin};
use super::Axis;

/// One stepper motor driven through STEP/DIR lines.
///
/// Generic over:
/// - `STEP`: STEP pin type (must implement `OutputPin`)
/// - `DIR`: DIR pin type (must implement `OutputPin`)
/// - `CLK`: microsecond clock (must implement [`Clock`])
/// - `EN`: optional ENABLE pin type (defaults to [`NoPin`])
/// - `MS`: microstep driver (defaults to [`Unwired`])
///
/// A move is started with [`start_move`](Self::start_move) and then driven
/// by calling [`next_action`](Self::next_action) until it returns 0.
pub struct StepperAxis<STEP, DIR, CLK, EN = NoPin, MS = Unwired>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
    EN: OutputPin,
    MS: MicrostepDriver,
{
    /// STEP pin (one rising edge per microstep).
    step_pin: STEP,

    /// DIR pin (high = CW, low = CCW, or inverted).
    dir_pin: DIR,

    /// ENABLE pin, if wired.
    enable_pin: Option<EN>,

    /// Time source for pulse scheduling.
    clock: CLK,

    /// Mode pin programming for the driver chip.
    microstep_driver: MS,

    /// Axis name for logging/debugging.
    name: heapless::String<32>,

    /// Full steps per revolution.
    motor_steps: u16,

    /// Configured cruise speed.
    rpm: Rpm,

    /// Current microstep divisor.
    microsteps: u16,

    /// Speed profile for new moves.
    profile: SpeedProfile,

    /// Level that enables the driver.
    enable_polarity: EnablePolarity,

    /// Whether direction pin logic is inverted.
    invert_direction: bool,

    /// Counters of the move in flight.
    ramp: Ramp,

    /// Last direction written to DIR (cached to avoid unnecessary pin writes).
    written_direction: Option<Direction>,

    /// Clock reading when the previous pulse ended.
    last_action_end: u32,

    /// Microseconds after `last_action_end` before the next pulse.
    next_action_interval: u32,
}

impl<STEP, DIR, CLK, EN, MS> StepperAxis<STEP, DIR, CLK, EN, MS>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
    EN: OutputPin,
    MS: MicrostepDriver,
{
    /// Initialize the pins and return a ready axis.
    ///
    /// DIR is set for clockwise, STEP is pulled low, the driver is disabled
    /// while the microstep divisor is programmed and then enabled.
    pub(crate) fn new(
        step_pin: STEP,
        dir_pin: DIR,
        enable_pin: Option<EN>,
        clock: CLK,
        microstep_driver: MS,
        config: AxisConfig,
    ) -> Result<Self> {
        let mut axis = Self {
            step_pin,
            dir_pin,
            enable_pin,
            clock,
            microstep_driver,
            name: config.name,
            motor_steps: config.motor_steps,
            rpm: config.rpm,
            microsteps: 1,
            profile: config.profile,
            enable_polarity: config.enable_polarity,
            invert_direction: config.invert_direction,
            ramp: Ramp::new(),
            written_direction: None,
            last_action_end: 0,
            next_action_interval: 0,
        };

        axis.write_direction(Direction::Clockwise)?;
        write(&mut axis.step_pin, false)?;
        axis.disable()?;
        axis.set_microstep(config.microsteps.value())?;
        axis.enable()?;

        Ok(axis)
    }

    /// Get the axis name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Full steps per revolution.
    #[inline]
    pub fn motor_steps(&self) -> u16 {
        self.motor_steps
    }

    /// Configured cruise speed.
    #[inline]
    pub fn rpm(&self) -> Rpm {
        self.rpm
    }

    /// Current microstep divisor.
    #[inline]
    pub fn microsteps(&self) -> u16 {
        self.microsteps
    }

    /// Speed profile used for new moves.
    #[inline]
    pub fn speed_profile(&self) -> SpeedProfile {
        self.profile
    }

    /// Largest divisor the microstep driver accepts.
    #[inline]
    pub fn max_microstep(&self) -> u16 {
        self.microstep_driver.max_microstep()
    }

    /// Borrow the clock.
    #[inline]
    pub fn clock(&self) -> &CLK {
        &self.clock
    }

    /// Timing inputs for planning a move right now.
    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            motor_steps: self.motor_steps,
            microsteps: self.microsteps,
            rpm: self.rpm,
            profile: self.profile,
        }
    }

    /// Set the cruise speed for subsequent moves.
    ///
    /// Non-positive or non-finite values are ignored.
    pub fn set_rpm(&mut self, rpm: f32) {
        match Rpm::new(rpm) {
            Ok(rpm) => self.rpm = rpm,
            Err(_) => warn!("ignoring rpm {}", rpm),
        }
    }

    /// Set the speed profile for subsequent moves.
    ///
    /// A linear profile with non-positive rates is ignored.
    pub fn set_speed_profile(&mut self, profile: SpeedProfile) {
        if profile.is_valid() {
            self.profile = profile;
        } else {
            warn!("ignoring speed profile with accel {} decel {}", profile.accel, profile.decel);
        }
    }

    /// Request a new microstep divisor.
    ///
    /// Only a power of two no larger than the driver's maximum is accepted;
    /// anything else leaves the current divisor in place. Returns the divisor
    /// in effect afterwards.
    ///
    /// # Errors
    ///
    /// Returns `MotorError::PinError` if a mode pin cannot be written.
    pub fn set_microstep(&mut self, microsteps: u16) -> Result<u16> {
        if !microsteps.is_power_of_two() || microsteps > self.microstep_driver.max_microstep() {
            warn!(
                "microstep divisor {} rejected, keeping {}",
                microsteps,
                self.microsteps
            );
            return Ok(self.microsteps);
        }
        self.microsteps = self.microstep_driver.apply_microstep(microsteps)?;
        Ok(self.microsteps)
    }

    /// Drive the ENABLE line to its active level. No-op when not wired.
    pub fn enable(&mut self) -> Result<()> {
        let level = self.enable_polarity.enabled_level();
        match self.enable_pin.as_mut() {
            Some(pin) => write(pin, level),
            None => Ok(()),
        }
    }

    /// Drive the ENABLE line to its inactive level. No-op when not wired.
    pub fn disable(&mut self) -> Result<()> {
        let level = !self.enable_polarity.enabled_level();
        match self.enable_pin.as_mut() {
            Some(pin) => write(pin, level),
            None => Ok(()),
        }
    }

    /// Microsteps needed to turn the shaft by `degrees`.
    #[inline]
    pub fn steps_for_rotation(&self, degrees: Degrees) -> i64 {
        self.motion_params().steps_for_rotation(degrees.value())
    }

    /// Begin a move of `steps` microsteps (sign selects the direction).
    ///
    /// With `duration_us` the cruise speed is lowered so the move takes that
    /// long, if possible; the configured rpm is left untouched. A move already
    /// in flight is altered by `steps` instead of restarted.
    pub fn start_move(&mut self, steps: i64, duration_us: Option<u64>) {
        if self.ramp.state() != MotionState::Stopped {
            self.alter_move(steps);
            return;
        }

        let direction = Direction::from_steps(steps);
        let count = u32::try_from(steps.unsigned_abs()).unwrap_or(u32::MAX);
        let plan = MovePlan::new(&self.motion_params(), count, duration_us);
        self.ramp.start(&plan, direction, self.profile);
        self.last_action_end = self.clock.now_micros();
        self.next_action_interval = 0;

        debug!(
            "move planned: {} steps, cruise at {}, brake at {}, pulse {} -> {} us",
            plan.steps,
            plan.steps_to_cruise,
            plan.steps_to_brake,
            plan.step_pulse,
            plan.cruise_step_pulse
        );
    }

    /// Begin a rotation by `degrees`.
    pub fn start_rotate(&mut self, degrees: Degrees) {
        let steps = self.steps_for_rotation(degrees);
        self.start_move(steps, None);
    }

    /// Emit the next microstep once it is due.
    ///
    /// Waits for the interval returned by the previous call, sets DIR, pulses
    /// STEP and returns the microseconds until the next call is due (at least
    /// 1). Returns 0 without touching any pin once the move is complete.
    ///
    /// # Errors
    ///
    /// Returns `MotorError::PinError` if STEP or DIR cannot be written.
    pub fn next_action(&mut self) -> Result<u32> {
        if self.ramp.steps_remaining() == 0 {
            self.last_action_end = 0;
            self.next_action_interval = 0;
            return Ok(0);
        }

        self.clock
            .wait_until(self.last_action_end, self.next_action_interval);

        // DIR is sampled on the rising STEP edge
        self.write_direction(self.ramp.direction())?;
        write(&mut self.step_pin, true)?;
        let pulse_start = self.clock.now_micros();
        let pulse = self.ramp.step_pulse();
        self.ramp.advance();

        let min_high = self.microstep_driver.min_pulse_width_us();
        let mut elapsed = self.clock.now_micros().wrapping_sub(pulse_start);
        if elapsed < min_high {
            self.clock.wait_until(pulse_start, min_high);
            elapsed = min_high;
        }
        write(&mut self.step_pin, false)?;

        self.last_action_end = self.clock.now_micros();
        self.next_action_interval = if pulse > elapsed { pulse - elapsed } else { 1 };
        Ok(self.next_action_interval)
    }

    /// Move `steps` microsteps and return when done.
    ///
    /// # Errors
    ///
    /// Returns `MotorError::PinError` on the first failed pin write.
    pub fn move_steps(&mut self, steps: i64) -> Result<()> {
        self.start_move(steps, None);
        while self.next_action()? != 0 {}
        Ok(())
    }

    /// Rotate by `degrees` and return when done.
    ///
    /// # Errors
    ///
    /// Returns `MotorError::PinError` on the first failed pin write.
    pub fn rotate(&mut self, degrees: Degrees) -> Result<()> {
        let steps = self.steps_for_rotation(degrees);
        self.move_steps(steps)
    }

    /// Add (positive) or remove (negative) microsteps from the move in flight.
    ///
    /// Only takes effect while accelerating or cruising; a move never shrinks
    /// below its braking distance.
    pub fn alter_move(&mut self, steps: i64) {
        if !self.ramp.alter(steps) {
            warn!("alter by {} ignored in state {:?}", steps, self.state());
        }
    }

    /// Begin braking now. Takes effect on the next [`next_action`](Self::next_action).
    pub fn start_brake(&mut self) {
        self.ramp.brake();
        debug!("brake: {} steps left", self.ramp.steps_remaining());
    }

    /// End the move now. Returns the microsteps that were left; a second call
    /// returns 0.
    pub fn stop(&mut self) -> u32 {
        self.ramp.stop()
    }

    /// Predicted duration in microseconds of a move of `steps` microsteps
    /// under the current settings.
    pub fn get_time_for_move(&self, steps: u32) -> u64 {
        let params = self.motion_params();
        MovePlan::new(&params, steps, None).duration_us(&params)
    }

    /// Phase of the move in flight.
    #[inline]
    pub fn state(&self) -> MotionState {
        self.ramp.state()
    }

    /// Microsteps completed in the current move.
    #[inline]
    pub fn steps_completed(&self) -> u32 {
        self.ramp.step_count()
    }

    /// Microsteps left in the current move.
    #[inline]
    pub fn steps_remaining(&self) -> u32 {
        self.ramp.steps_remaining()
    }

    /// Direction of the current move.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.ramp.direction()
    }

    /// Current step period in microseconds.
    #[inline]
    pub fn step_pulse(&self) -> u32 {
        self.ramp.step_pulse()
    }

    /// Instantaneous speed implied by the current step period, or 0 when stopped.
    pub fn current_rpm(&self) -> f32 {
        let pulse = self.ramp.step_pulse();
        if self.state() == MotionState::Stopped || pulse == 0 {
            return 0.0;
        }
        60_000_000.0 / (pulse as f32 * self.microsteps as f32 * self.motor_steps as f32)
    }

    /// Give the pins, clock and microstep driver back.
    pub fn release(self) -> (STEP, DIR, Option<EN>, CLK, MS) {
        (
            self.step_pin,
            self.dir_pin,
            self.enable_pin,
            self.clock,
            self.microstep_driver,
        )
    }

    fn write_direction(&mut self, direction: Direction) -> Result<()> {
        if self.written_direction == Some(direction) {
            return Ok(());
        }

        let pin_high = match direction {
            Direction::Clockwise => !self.invert_direction,
            Direction::CounterClockwise => self.invert_direction,
        };
        write(&mut self.dir_pin, pin_high)?;

        self.written_direction = Some(direction);
        Ok(())
    }
}

impl<STEP, DIR, CLK, EN, MS> Axis for StepperAxis<STEP, DIR, CLK, EN, MS>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
    EN: OutputPin,
    MS: MicrostepDriver,
{
    fn start_move(&mut self, steps: i64, duration_us: Option<u64>) {
        StepperAxis::start_move(self, steps, duration_us)
    }

    fn next_action(&mut self) -> Result<u32> {
        StepperAxis::next_action(self)
    }

    fn alter_move(&mut self, steps: i64) {
        StepperAxis::alter_move(self, steps)
    }

    fn start_brake(&mut self) {
        StepperAxis::start_brake(self)
    }

    fn stop(&mut self) -> u32 {
        StepperAxis::stop(self)
    }

    fn time_for_move(&self, steps: u32) -> u64 {
        self.get_time_for_move(steps)
    }

    fn steps_for_rotation(&self, degrees: Degrees) -> i64 {
        StepperAxis::steps_for_rotation(self, degrees)
    }

    fn set_microstep(&mut self, microsteps: u16) -> Result<u16> {
        StepperAxis::set_microstep(self, microsteps)
    }

    fn enable(&mut self) -> Result<()> {
        StepperAxis::enable(self)
    }

    fn disable(&mut self) -> Result<()> {
        StepperAxis::disable(self)
    }

    fn state(&self) -> MotionState {
        StepperAxis::state(self)
    }

    fn steps_completed(&self) -> u32 {
        StepperAxis::steps_completed(self)
    }

    fn steps_remaining(&self) -> u32 {
        StepperAxis::steps_remaining(self)
    }

    fn direction(&self) -> Direction {
        StepperAxis::direction(self)
    }
}
