//! Microstep resolution capability.
//!
//! A driver chip exposes up to three mode pins whose levels select the
//! microstep divisor. The axis only needs to know the largest divisor the
//! chip supports, how to program a divisor, and how long STEP must stay high.

use embedded_hal::digital::OutputPin;

use super::pins::write;
use crate::error::Result;

/// Largest divisor assumed when the chip is unknown.
pub const DEFAULT_MAX_MICROSTEP: u16 = 128;

/// Microstep programming for one driver chip.
pub trait MicrostepDriver {
    /// Largest supported divisor. Always a power of two.
    fn max_microstep(&self) -> u16;

    /// Program the mode pins for `divisor` and return the divisor in effect.
    ///
    /// `divisor` has already been checked to be a power of two no larger
    /// than [`max_microstep`](Self::max_microstep).
    fn apply_microstep(&mut self, divisor: u16) -> Result<u16>;

    /// Minimum STEP high time in microseconds.
    #[inline]
    fn min_pulse_width_us(&self) -> u32 {
        1
    }
}

/// Driver whose mode pins are hardwired or not connected.
///
/// Only the timing math follows the configured divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unwired {
    max: u16,
    min_pulse_us: u32,
}

impl Unwired {
    /// Unwired driver with a custom ceiling and STEP high time.
    pub const fn new(max: u16, min_pulse_us: u32) -> Self {
        Self { max, min_pulse_us }
    }

    /// A4988 with hardwired MS1..MS3.
    pub const fn a4988() -> Self {
        Self::new(A4988_TABLE.len_max(), A4988_TABLE.min_pulse_us)
    }

    /// DRV8825 with hardwired MODE0..MODE2.
    pub const fn drv8825() -> Self {
        Self::new(DRV8825_TABLE.len_max(), DRV8825_TABLE.min_pulse_us)
    }
}

impl Default for Unwired {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MICROSTEP, 1)
    }
}

impl MicrostepDriver for Unwired {
    fn max_microstep(&self) -> u16 {
        self.max
    }

    fn apply_microstep(&mut self, divisor: u16) -> Result<u16> {
        Ok(divisor)
    }

    fn min_pulse_width_us(&self) -> u32 {
        self.min_pulse_us
    }
}

/// Mode pin truth table of a driver chip.
///
/// Entry `i` holds the pin levels for divisor `2^i`, packed as
/// `0b<pin1><pin2><pin3>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTable {
    levels: &'static [u8],
    min_pulse_us: u32,
}

impl ModeTable {
    /// Largest divisor covered by the table.
    const fn len_max(&self) -> u16 {
        1 << (self.levels.len() - 1)
    }
}

/// A4988: MS1, MS2, MS3 for 1, 2, 4, 8, 16.
pub const A4988_TABLE: ModeTable = ModeTable {
    levels: &[0b000, 0b100, 0b010, 0b110, 0b111],
    min_pulse_us: 1,
};

/// DRV8825: MODE0, MODE1, MODE2 for 1, 2, 4, 8, 16, 32.
pub const DRV8825_TABLE: ModeTable = ModeTable {
    levels: &[0b000, 0b100, 0b010, 0b110, 0b001, 0b111],
    min_pulse_us: 2,
};

/// Driver with three wired mode pins programmed from a truth table.
#[derive(Debug)]
pub struct ModePins<P1, P2, P3> {
    pins: (P1, P2, P3),
    table: ModeTable,
}

impl<P1, P2, P3> ModePins<P1, P2, P3>
where
    P1: OutputPin,
    P2: OutputPin,
    P3: OutputPin,
{
    /// Mode pins driven from a custom table.
    pub fn new(pin1: P1, pin2: P2, pin3: P3, table: ModeTable) -> Self {
        Self {
            pins: (pin1, pin2, pin3),
            table,
        }
    }

    /// A4988 with MS1, MS2, MS3 wired.
    pub fn a4988(ms1: P1, ms2: P2, ms3: P3) -> Self {
        Self::new(ms1, ms2, ms3, A4988_TABLE)
    }

    /// DRV8825 with MODE0, MODE1, MODE2 wired.
    pub fn drv8825(mode0: P1, mode1: P2, mode2: P3) -> Self {
        Self::new(mode0, mode1, mode2, DRV8825_TABLE)
    }

    /// Give the pins back.
    pub fn release(self) -> (P1, P2, P3) {
        self.pins
    }
}

impl<P1, P2, P3> MicrostepDriver for ModePins<P1, P2, P3>
where
    P1: OutputPin,
    P2: OutputPin,
    P3: OutputPin,
{
    fn max_microstep(&self) -> u16 {
        self.table.len_max()
    }

    fn apply_microstep(&mut self, divisor: u16) -> Result<u16> {
        let index = divisor.trailing_zeros() as usize;
        let Some(&mask) = self.table.levels.get(index) else {
            return Ok(divisor);
        };
        write(&mut self.pins.0, mask & 0b100 != 0)?;
        write(&mut self.pins.1, mask & 0b010 != 0)?;
        write(&mut self.pins.2, mask & 0b001 != 0)?;
        Ok(divisor)
    }

    fn min_pulse_width_us(&self) -> u32 {
        self.table.min_pulse_us
    }
}
