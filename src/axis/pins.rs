//! Placeholder pin for optional outputs.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

/// An output that is not connected.
///
/// Used as the default type for the ENABLE line and for mode pins that are
/// hardwired on the board. Writes always succeed and do nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Drive `pin` to `high`, mapping any HAL error to a pin fault.
#[inline]
pub(crate) fn write<P: OutputPin>(pin: &mut P, high: bool) -> crate::Result<()> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| crate::error::MotorError::PinError.into())
}
