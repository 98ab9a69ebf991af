//! Builder pattern for StepperAxis.

use embedded_hal::digital::OutputPin;

use crate::clock::Clock;
use crate::config::units::{Microsteps, Rpm};
use crate::config::{validate_axis, AxisConfig, EnablePolarity, SystemConfig};
use crate::error::{ConfigError, Error, Result};
use crate::motion::SpeedProfile;

use super::driver::StepperAxis;
use super::microstep::{MicrostepDriver, Unwired};
use super::pins::NoPin;

/// Builder for creating StepperAxis instances.
///
/// STEP, DIR and the clock are required. The ENABLE pin and microstep
/// driver are optional and change the builder's type when set.
pub struct StepperAxisBuilder<STEP, DIR, CLK, EN = NoPin, MS = Unwired>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
    EN: OutputPin,
    MS: MicrostepDriver,
{
    step_pin: Option<STEP>,
    dir_pin: Option<DIR>,
    clock: Option<CLK>,
    enable_pin: Option<EN>,
    microstep_driver: MS,
    name: Option<heapless::String<32>>,
    motor_steps: Option<u16>,
    rpm: Option<f32>,
    microsteps: u16,
    profile: SpeedProfile,
    enable_polarity: EnablePolarity,
    invert_direction: bool,
}

impl<STEP, DIR, CLK> Default for StepperAxisBuilder<STEP, DIR, CLK>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<STEP, DIR, CLK> StepperAxisBuilder<STEP, DIR, CLK>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            step_pin: None,
            dir_pin: None,
            clock: None,
            enable_pin: None,
            microstep_driver: Unwired::default(),
            name: None,
            motor_steps: None,
            rpm: None,
            microsteps: 1,
            profile: SpeedProfile::default(),
            enable_polarity: EnablePolarity::default(),
            invert_direction: false,
        }
    }
}

impl<STEP, DIR, CLK, EN, MS> StepperAxisBuilder<STEP, DIR, CLK, EN, MS>
where
    STEP: OutputPin,
    DIR: OutputPin,
    CLK: Clock,
    EN: OutputPin,
    MS: MicrostepDriver,
{
    /// Set the STEP pin.
    pub fn step_pin(mut self, pin: STEP) -> Self {
        self.step_pin = Some(pin);
        self
    }

    /// Set the DIR pin.
    pub fn dir_pin(mut self, pin: DIR) -> Self {
        self.dir_pin = Some(pin);
        self
    }

    /// Set the clock.
    pub fn clock(mut self, clock: CLK) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the ENABLE pin.
    pub fn enable_pin<E: OutputPin>(self, pin: E) -> StepperAxisBuilder<STEP, DIR, CLK, E, MS> {
        StepperAxisBuilder {
            step_pin: self.step_pin,
            dir_pin: self.dir_pin,
            clock: self.clock,
            enable_pin: Some(pin),
            microstep_driver: self.microstep_driver,
            name: self.name,
            motor_steps: self.motor_steps,
            rpm: self.rpm,
            microsteps: self.microsteps,
            profile: self.profile,
            enable_polarity: self.enable_polarity,
            invert_direction: self.invert_direction,
        }
    }

    /// Set the microstep driver.
    pub fn microstep_driver<M: MicrostepDriver>(
        self,
        driver: M,
    ) -> StepperAxisBuilder<STEP, DIR, CLK, EN, M> {
        StepperAxisBuilder {
            step_pin: self.step_pin,
            dir_pin: self.dir_pin,
            clock: self.clock,
            enable_pin: self.enable_pin,
            microstep_driver: driver,
            name: self.name,
            motor_steps: self.motor_steps,
            rpm: self.rpm,
            microsteps: self.microsteps,
            profile: self.profile,
            enable_polarity: self.enable_polarity,
            invert_direction: self.invert_direction,
        }
    }

    /// Set the axis name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = heapless::String::try_from(name).ok();
        self
    }

    /// Set full steps per revolution (before microstepping).
    pub fn motor_steps(mut self, steps: u16) -> Self {
        self.motor_steps = Some(steps);
        self
    }

    /// Set the cruise speed in revolutions per minute.
    pub fn rpm(mut self, rpm: f32) -> Self {
        self.rpm = Some(rpm);
        self
    }

    /// Set the initial microstep divisor.
    ///
    /// Checked against the microstep driver when the axis is built.
    pub fn microsteps(mut self, microsteps: u16) -> Self {
        self.microsteps = microsteps;
        self
    }

    /// Set the speed profile.
    pub fn speed_profile(mut self, profile: SpeedProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the ENABLE polarity.
    pub fn enable_polarity(mut self, polarity: EnablePolarity) -> Self {
        self.enable_polarity = polarity;
        self
    }

    /// Set direction inversion.
    pub fn invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Configure from an AxisConfig.
    pub fn from_axis_config(mut self, config: &AxisConfig) -> Self {
        self.name = Some(config.name.clone());
        self.motor_steps = Some(config.motor_steps);
        self.rpm = Some(config.rpm.value());
        self.microsteps = config.microsteps.value();
        self.profile = config.profile;
        self.enable_polarity = config.enable_polarity;
        self.invert_direction = config.invert_direction;
        self
    }

    /// Configure from SystemConfig by axis name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AxisNotFound` if no axis has that name.
    pub fn from_config(self, config: &SystemConfig, axis_name: &str) -> Result<Self> {
        let axis_config = config.axis(axis_name).ok_or_else(|| {
            Error::Config(ConfigError::AxisNotFound(
                heapless::String::try_from(axis_name).unwrap_or_default(),
            ))
        })?;

        Ok(self.from_axis_config(axis_config))
    }

    /// Build the StepperAxis and initialize its pins.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing, a parameter is out of
    /// range, or a pin cannot be written during initialization.
    pub fn build(self) -> Result<StepperAxis<STEP, DIR, CLK, EN, MS>> {
        let step_pin = self
            .step_pin
            .ok_or(Error::Config(ConfigError::MissingField("step_pin")))?;
        let dir_pin = self
            .dir_pin
            .ok_or(Error::Config(ConfigError::MissingField("dir_pin")))?;
        let clock = self
            .clock
            .ok_or(Error::Config(ConfigError::MissingField("clock")))?;
        let motor_steps = self
            .motor_steps
            .ok_or(Error::Config(ConfigError::MissingField("motor_steps")))?;
        let rpm = self
            .rpm
            .ok_or(Error::Config(ConfigError::MissingField("rpm")))?;

        let name = self.name.unwrap_or_else(|| {
            let mut name = heapless::String::new();
            let _ = name.push_str("axis");
            name
        });

        let config = AxisConfig {
            name,
            motor_steps,
            rpm: Rpm::new(rpm)?,
            microsteps: Microsteps::new(self.microsteps)?,
            profile: self.profile,
            enable_polarity: self.enable_polarity,
            invert_direction: self.invert_direction,
        };
        validate_axis(&config)?;

        StepperAxis::new(
            step_pin,
            dir_pin,
            self.enable_pin,
            clock,
            self.microstep_driver,
            config,
        )
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use crate::motion::ProfileMode;

    type Builder = StepperAxisBuilder<NoPin, NoPin, SimClock>;

    #[test]
    fn test_missing_step_pin() {
        let result = Builder::new()
            .dir_pin(NoPin)
            .clock(SimClock::new())
            .motor_steps(200)
            .rpm(60.0)
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingField("step_pin")))
        ));
    }

    #[test]
    fn test_missing_clock() {
        let result = Builder::new()
            .step_pin(NoPin)
            .dir_pin(NoPin)
            .motor_steps(200)
            .rpm(60.0)
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingField("clock")))
        ));
    }

    #[test]
    fn test_rejects_zero_rpm() {
        let result = Builder::new()
            .step_pin(NoPin)
            .dir_pin(NoPin)
            .clock(SimClock::new())
            .motor_steps(200)
            .rpm(0.0)
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidRpm(_)))
        ));
    }

    #[test]
    fn test_rejects_zero_motor_steps() {
        let result = Builder::new()
            .step_pin(NoPin)
            .dir_pin(NoPin)
            .clock(SimClock::new())
            .motor_steps(0)
            .rpm(60.0)
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidMotorSteps(0)))
        ));
    }

    #[test]
    fn test_rejects_bad_acceleration() {
        let result = Builder::new()
            .step_pin(NoPin)
            .dir_pin(NoPin)
            .clock(SimClock::new())
            .motor_steps(200)
            .rpm(60.0)
            .speed_profile(SpeedProfile::linear(-1.0, 1000.0))
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidAcceleration(_)))
        ));
    }

    #[test]
    fn test_from_config() {
        let toml = r#"
[axes.y]
name = "Y"
motor_steps = 400
rpm = 90.0
microsteps = 8

[axes.y.profile]
mode = "linear"
accel = 2000.0
decel = 1500.0
"#;
        let config = crate::config::parse_config(toml).unwrap();
        let axis = Builder::new()
            .step_pin(NoPin)
            .dir_pin(NoPin)
            .clock(SimClock::new())
            .from_config(&config, "y")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(axis.name(), "Y");
        assert_eq!(axis.motor_steps(), 400);
        assert_eq!(axis.microsteps(), 8);
        assert_eq!(axis.speed_profile().mode, ProfileMode::Linear);
        assert_eq!(axis.rpm().value(), 90.0);
    }

    #[test]
    fn test_from_config_unknown_axis() {
        let config = SystemConfig::default();
        let result = Builder::new().from_config(&config, "z");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::AxisNotFound(_)))
        ));
    }

    #[test]
    fn test_microsteps_above_driver_max_fall_back() {
        let axis = Builder::new()
            .step_pin(NoPin)
            .dir_pin(NoPin)
            .clock(SimClock::new())
            .microstep_driver(Unwired::a4988())
            .motor_steps(200)
            .rpm(60.0)
            .microsteps(32)
            .build()
            .unwrap();
        assert_eq!(axis.microsteps(), 1);
        assert_eq!(axis.max_microstep(), 16);
    }
}
