//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::motion::ProfileMode;

use super::{AxisConfig, SystemConfig};

/// Validate a system configuration.
///
/// Checks every axis:
/// - Motor step count is non-zero
/// - A linear profile has positive, finite rates
///
/// Speed and microstep values are already checked during deserialization.
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    for (_name, axis) in config.axes.iter() {
        validate_axis(axis)?;
    }
    Ok(())
}

/// Validate a single axis configuration.
pub fn validate_axis(config: &AxisConfig) -> Result<()> {
    if config.motor_steps == 0 {
        return Err(Error::Config(ConfigError::InvalidMotorSteps(
            config.motor_steps,
        )));
    }

    if config.profile.mode == ProfileMode::Linear {
        let accel = config.profile.accel;
        if !(accel.is_finite() && accel > 0.0) {
            return Err(Error::Config(ConfigError::InvalidAcceleration(accel)));
        }
        let decel = config.profile.decel;
        if !(decel.is_finite() && decel > 0.0) {
            return Err(Error::Config(ConfigError::InvalidDeceleration(decel)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::{Microsteps, Rpm};
    use crate::config::EnablePolarity;
    use crate::motion::SpeedProfile;

    fn axis(profile: SpeedProfile) -> AxisConfig {
        AxisConfig {
            name: heapless::String::try_from("test").unwrap(),
            motor_steps: 200,
            rpm: Rpm::new(120.0).unwrap(),
            microsteps: Microsteps::FULL,
            profile,
            enable_polarity: EnablePolarity::ActiveLow,
            invert_direction: false,
        }
    }

    #[test]
    fn test_zero_motor_steps() {
        let mut config = axis(SpeedProfile::constant());
        config.motor_steps = 0;
        assert!(matches!(
            validate_axis(&config),
            Err(Error::Config(ConfigError::InvalidMotorSteps(0)))
        ));
    }

    #[test]
    fn test_linear_rates_must_be_positive() {
        let config = axis(SpeedProfile::linear(0.0, 500.0));
        assert!(matches!(
            validate_axis(&config),
            Err(Error::Config(ConfigError::InvalidAcceleration(_)))
        ));

        let config = axis(SpeedProfile::linear(500.0, -1.0));
        assert!(matches!(
            validate_axis(&config),
            Err(Error::Config(ConfigError::InvalidDeceleration(_)))
        ));
    }

    #[test]
    fn test_constant_ignores_rates() {
        let mut profile = SpeedProfile::constant();
        profile.accel = 0.0;
        assert!(validate_axis(&axis(profile)).is_ok());
    }
}
