//! Embedded-hal I2C drivers for the Sensirion SPS30 particulate matter sensor and the BH1750
//! ambient light sensor.
//!
//! The SPS30 talks a word based protocol where every two data bytes are followed by a CRC-8.
//! [`frame`] builds and checks those frames, [`values`] turns them into typed readings and
//! [`Sps30`] issues the commands. The [`Bh1750`] uses plain single byte commands on the same
//! bus traits.
//!
//! Neither driver keeps track of the sensor's mode, and nothing is retried: every bus or
//! checksum failure is returned to the caller as an [`Error`].
#![cfg_attr(not(test), no_std)]

pub mod bh1750;
pub mod crc;
pub mod frame;
pub mod sps30;
pub mod values;

pub use bh1750::Bh1750;
pub use crc::CrcError;
pub use frame::FrameError;
pub use sps30::Sps30;
pub use values::{
    DeviceIdentity, DeviceInfo, DeviceStatus, FirmwareVersion, Float, Integer, Measurement,
    MeasurementFormat, OutputFormat,
};

/// Driver errors
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C bus error
    I2c(E),
    /// A received word failed its checksum
    Crc(CrcError),
    /// The caller passed a value the sensor does not accept
    InvalidArgument,
}

impl<E> From<CrcError> for Error<E> {
    fn from(e: CrcError) -> Self {
        Error::Crc(e)
    }
}

impl<E> From<FrameError> for Error<E> {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Crc(e) => Error::Crc(e),
            FrameError::Length(_) => Error::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_to_driver_errors() {
        let crc = CrcError {
            word: 2,
            received: 0x00,
            computed: 0x81,
        };
        assert_eq!(Error::<()>::from(FrameError::Crc(crc)), Error::Crc(crc));
        assert_eq!(
            Error::<()>::from(FrameError::Length(7)),
            Error::InvalidArgument
        );
    }
}
