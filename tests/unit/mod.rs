//! Unit test harness for stepper-drive.
//!
//! Configuration checks that go through the public API only.

mod config_parsing;
mod config_validation;
