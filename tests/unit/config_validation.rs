//! Unit tests for configuration validation.

use stepper_drive::config::{validate_config, SystemConfig};
use stepper_drive::error::{ConfigError, Error};

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    let toml_str = r#"
[axes.stepper1]
name = "main_axis"
motor_steps = 200
rpm = 120.0
microsteps = 16

[axes.stepper1.profile]
mode = "linear"
accel = 1000.0
decel = 1000.0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    assert!(validate_config(&config).is_ok());
}

/// Test validation fails for an axis without motor steps.
#[test]
fn test_zero_motor_steps_fails() {
    let toml_str = r#"
[axes.stepper1]
name = "main_axis"
motor_steps = 0
rpm = 120.0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let result = validate_config(&config);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidMotorSteps(0)))
    ));
}

/// Test validation fails for a linear profile without deceleration.
#[test]
fn test_negative_deceleration_fails() {
    let toml_str = r#"
[axes.stepper1]
name = "main_axis"
motor_steps = 200
rpm = 120.0

[axes.stepper1.profile]
mode = "linear"
accel = 1000.0
decel = -5.0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let result = validate_config(&config);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidDeceleration(_)))
    ));
}

/// Test that rates are not checked for a constant-speed axis.
#[test]
fn test_constant_profile_ignores_rates() {
    let toml_str = r#"
[axes.stepper1]
name = "main_axis"
motor_steps = 200
rpm = 120.0

[axes.stepper1.profile]
mode = "constant"
accel = 0.0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    assert!(validate_config(&config).is_ok());
}
