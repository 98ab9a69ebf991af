//! Per-axis configuration from TOML.

use heapless::String;
use serde::Deserialize;

use super::units::{Microsteps, Rpm};
use crate::motion::{MotionParams, SpeedProfile};

/// Logic level that turns the driver outputs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnablePolarity {
    /// Driver enabled with the pin low (A4988, DRV8825 `~EN`).
    #[default]
    ActiveLow,
    /// Driver enabled with the pin high.
    ActiveHigh,
}

impl EnablePolarity {
    /// Pin level that enables the driver.
    #[inline]
    pub fn enabled_level(self) -> bool {
        matches!(self, EnablePolarity::ActiveHigh)
    }
}

/// Complete configuration for one STEP/DIR axis.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Human-readable name (max 32 chars).
    pub name: String<32>,

    /// Full steps per revolution (200 for 1.8° motors).
    pub motor_steps: u16,

    /// Target speed in revolutions per minute.
    pub rpm: Rpm,

    /// Microstep divisor requested at start-up.
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Speed profile for moves on this axis.
    #[serde(default)]
    pub profile: SpeedProfile,

    /// Enable pin polarity.
    #[serde(default)]
    pub enable_polarity: EnablePolarity,

    /// Swap the DIR pin level for both directions.
    #[serde(default)]
    pub invert_direction: bool,
}

impl AxisConfig {
    /// Motion parameters at the configured microstep resolution.
    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            motor_steps: self.motor_steps,
            microsteps: self.microsteps.value(),
            rpm: self.rpm,
            profile: self.profile,
        }
    }
}
