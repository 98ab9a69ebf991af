//! Unit tests for TOML configuration parsing.

use stepper_drive::config::{load_config, EnablePolarity, SystemConfig};
use stepper_drive::motion::ProfileMode;

/// Test parsing a complete axis configuration from TOML.
#[test]
fn test_parse_axis_config() {
    let toml_str = r#"
[axes.stepper1]
name = "main_axis"
motor_steps = 200
rpm = 120.0
microsteps = 16
enable_polarity = "active_low"
invert_direction = false

[axes.stepper1.profile]
mode = "linear"
accel = 1000.0
decel = 800.0
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let axis = config.axis("stepper1").expect("Axis not found");

    assert_eq!(axis.name.as_str(), "main_axis");
    assert_eq!(axis.motor_steps, 200);
    assert_eq!(axis.rpm.value(), 120.0);
    assert_eq!(axis.microsteps.value(), 16);
    assert_eq!(axis.enable_polarity, EnablePolarity::ActiveLow);
    assert_eq!(axis.profile.mode, ProfileMode::Linear);
    assert_eq!(axis.profile.accel, 1000.0);
    assert_eq!(axis.profile.decel, 800.0);
    assert!(!axis.invert_direction);
}

/// Test that omitted fields take their defaults.
#[test]
fn test_parse_defaults() {
    let toml_str = r#"
[axes.x]
name = "X"
motor_steps = 200
rpm = 60.0

[axes.y]
name = "Y"
motor_steps = 200
rpm = 60.0

[axes.y.profile]
mode = "linear"
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let x = config.axis("x").expect("Axis not found");
    assert_eq!(x.microsteps.value(), 1);
    assert_eq!(x.profile.mode, ProfileMode::Constant);
    assert_eq!(x.enable_polarity, EnablePolarity::ActiveLow);

    let y = config.axis("y").expect("Axis not found");
    assert_eq!(y.profile.mode, ProfileMode::Linear);
    assert_eq!(y.profile.accel, 1000.0);
    assert_eq!(y.profile.decel, 1000.0);
}

/// Test that non-positive rpm is rejected while parsing.
#[test]
fn test_parse_rejects_zero_rpm() {
    let toml_str = r#"
[axes.x]
name = "X"
motor_steps = 200
rpm = 0.0
"#;

    let result: Result<SystemConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err());
}

/// Test that a missing required field is rejected.
#[test]
fn test_parse_rejects_missing_motor_steps() {
    let toml_str = r#"
[axes.x]
name = "X"
rpm = 60.0
"#;

    let result: Result<SystemConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err());
}

/// Test loading a configuration file from disk.
#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join("stepper_drive_load_config_test.toml");
    std::fs::write(
        &path,
        r#"
[axes.z]
name = "Z"
motor_steps = 400
rpm = 30.0
microsteps = 4
"#,
    )
    .expect("Failed to write config file");

    let config = load_config(&path).expect("Failed to load config");
    let _ = std::fs::remove_file(&path);

    let axis = config.axis("z").expect("Axis not found");
    assert_eq!(axis.motor_steps, 400);
    assert_eq!(axis.microsteps.value(), 4);
}
