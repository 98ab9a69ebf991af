//! # stepper-drive
//!
//! STEP/DIR pulse generation for stepper motor drivers (A4988, DRV8825 and
//! compatibles) with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Non-blocking**: each axis advances one microstep per `next_action` call
//!   and reports when it is next due
//! - **Speed profiles**: constant speed or trapezoidal ramps with independent
//!   acceleration and deceleration
//! - **Time-bounded moves**: a move can be stretched to last a given duration
//! - **Multi-axis**: interleave up to three axes on one control loop, or have
//!   them all finish at the same moment
//! - **embedded-hal 1.0**: uses `OutputPin` for STEP, DIR, ENABLE and mode pins
//! - **no_std compatible**: core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepper_drive::{SpeedProfile, StdClock, StepperAxisBuilder};
//!
//! let mut axis = StepperAxisBuilder::new()
//!     .step_pin(step_pin)
//!     .dir_pin(dir_pin)
//!     .clock(StdClock::new())
//!     .motor_steps(200)
//!     .rpm(120.0)
//!     .speed_profile(SpeedProfile::linear(1000.0, 1000.0))
//!     .build()?;
//!
//! // Blocking
//! axis.move_steps(400)?;
//!
//! // Non-blocking
//! axis.start_move(-400, None);
//! loop {
//!     let wait_us = axis.next_action()?;
//!     if wait_us == 0 {
//!         break;
//!     }
//!     // do other work for up to `wait_us` microseconds
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O, TOML parsing and host clocks
//! - `alloc`: Enables heap allocation for no_std with allocator
//! - `defmt`: Enables defmt logging for embedded targets
//! - `tracing`: Enables tracing logging on hosts

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

// Core modules
pub mod axis;
pub mod clock;
pub mod config;
pub mod error;
pub mod group;
pub mod motion;

// Re-exports for ergonomic API
pub use axis::{Axis, MicrostepDriver, ModePins, NoPin, StepperAxis, StepperAxisBuilder, Unwired};
pub use clock::Clock;
pub use config::{validate_config, AxisConfig, EnablePolarity, SystemConfig};
pub use error::{Error, Result};
pub use group::{MultiAxis, SyncAxis};
pub use motion::{Direction, MotionState, ProfileMode, SpeedProfile};

#[cfg(feature = "std")]
pub use clock::{SimClock, StdClock};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Degrees, Microsteps, Rpm, UnitExt};
