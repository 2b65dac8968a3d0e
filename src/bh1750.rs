//! BH1750 ambient light sensor.
//!
//! Every command is a single byte and the result is a plain big-endian 16-bit count, there is no
//! checksum on this device.

use crate::Error;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Read, Write};
use log::debug;

/// Address with the ADDR pin pulled low
pub const ADDRESS_LOW: u8 = 0x23;

/// Address with the ADDR pin pulled high
pub const ADDRESS_HIGH: u8 = 0x5C;

const POWER_DOWN: u8 = 0x00;
const POWER_ON: u8 = 0x01;
const RESET: u8 = 0x07;
const MEASUREMENT_TIME_HIGH: u8 = 0x40;
const MEASUREMENT_TIME_LOW: u8 = 0x60;

/// Counts per lux at the default measurement time
const LUX_DIVISOR: f32 = 1.2;

/// Measurement resolution and repetition
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// 1 lx resolution, continuous
    ContinuousHigh = 0x10,
    /// 0.5 lx resolution, continuous
    ContinuousHigh2 = 0x11,
    /// 4 lx resolution, continuous
    ContinuousLow = 0x13,
    /// 1 lx resolution, powers down after one measurement
    OneTimeHigh = 0x20,
    OneTimeHigh2 = 0x21,
    OneTimeLow = 0x23,
}

impl Mode {
    /// How long to wait for a continuous measurement, `None` for the one-time modes
    fn conversion_time_ms(self) -> Option<u16> {
        match self {
            Mode::ContinuousHigh | Mode::ContinuousHigh2 => Some(200),
            Mode::ContinuousLow => Some(30),
            Mode::OneTimeHigh | Mode::OneTimeHigh2 | Mode::OneTimeLow => None,
        }
    }
}

/// Convert a raw count to lux, assuming the default measurement time
pub fn raw_to_lux(raw: u16) -> f32 {
    raw as f32 / LUX_DIVISOR
}

/// A BH1750 on the I2C bus `I2C`
pub struct Bh1750<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<E, I2C, D> Bh1750<I2C, D>
where
    I2C: Read<Error = E> + Write<Error = E>,
    D: DelayMs<u16>,
{
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Bh1750 {
            i2c,
            delay,
            address,
        }
    }

    pub fn new_default(i2c: I2C, delay: D) -> Self {
        Self::new(i2c, delay, ADDRESS_LOW)
    }

    /// Release the I2C bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn command(&mut self, opcode: u8) -> Result<(), Error<E>> {
        debug!("bh1750: command {:#04x}", opcode);
        self.i2c.write(self.address, &[opcode]).map_err(Error::I2c)
    }

    pub fn power_on(&mut self) -> Result<(), Error<E>> {
        self.command(POWER_ON)
    }

    pub fn power_down(&mut self) -> Result<(), Error<E>> {
        self.command(POWER_DOWN)
    }

    /// Clear the data register
    ///
    /// The reset command is ignored while powered down, so the sensor is powered on first.
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.power_on()?;
        self.delay.delay_ms(10);
        self.command(RESET)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error<E>> {
        self.command(mode as u8)
    }

    /// Read the last measured count
    pub fn read_raw(&mut self) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c.read(self.address, &mut buf).map_err(Error::I2c)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Change the measurement time register (default 69)
    ///
    /// [`raw_to_lux`] assumes the default, scale its result by `69 / mtreg` after changing this.
    pub fn set_measurement_time(&mut self, mtreg: u8) -> Result<(), Error<E>> {
        self.command(MEASUREMENT_TIME_HIGH | (mtreg >> 5))?;
        self.command(MEASUREMENT_TIME_LOW | (mtreg & 0x1F))
    }

    /// Power on, start `mode`, wait for the conversion and return the result in lux
    ///
    /// Only the continuous modes are accepted.
    pub fn read_lux(&mut self, mode: Mode) -> Result<f32, Error<E>> {
        let wait = mode.conversion_time_ms().ok_or(Error::InvalidArgument)?;
        self.power_on()?;
        self.set_mode(mode)?;
        self.delay.delay_ms(wait);
        self.read_raw().map(raw_to_lux)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::delay::MockNoop as MockDelay;
    use embedded_hal_mock::i2c::Mock as I2cMock;
    use embedded_hal_mock::i2c::Transaction;

    fn sensor(expectations: &[Transaction]) -> Bh1750<I2cMock, MockDelay> {
        Bh1750::new_default(I2cMock::new(expectations), MockDelay::new())
    }

    #[test]
    fn read_lux_continuous_high() {
        let expectations = [
            Transaction::write(ADDRESS_LOW, vec![POWER_ON]),
            Transaction::write(ADDRESS_LOW, vec![0x10]),
            Transaction::read(ADDRESS_LOW, vec![0x00, 0x0C]),
        ];
        let mut bh = sensor(&expectations);
        assert_eq!(bh.read_lux(Mode::ContinuousHigh), Ok(10.0));
        let (mut i2c, _) = bh.release();
        i2c.done();
    }

    #[test]
    fn one_time_modes_are_rejected_by_read_lux() {
        let mut bh = sensor(&[]);
        assert_eq!(bh.read_lux(Mode::OneTimeLow), Err(Error::InvalidArgument));
        let (mut i2c, _) = bh.release();
        i2c.done();
    }

    #[test]
    fn reset_powers_on_first() {
        let expectations = [
            Transaction::write(ADDRESS_LOW, vec![POWER_ON]),
            Transaction::write(ADDRESS_LOW, vec![RESET]),
            Transaction::write(ADDRESS_LOW, vec![POWER_DOWN]),
        ];
        let mut bh = sensor(&expectations);
        bh.reset().unwrap();
        bh.power_down().unwrap();
        let (mut i2c, _) = bh.release();
        i2c.done();
    }

    #[test]
    fn measurement_time_is_split() {
        // 0b1111_1110: high bits 0b111, low bits 0b11110
        let expectations = [
            Transaction::write(ADDRESS_LOW, vec![0x47]),
            Transaction::write(ADDRESS_LOW, vec![0x7E]),
        ];
        let mut bh = sensor(&expectations);
        bh.set_measurement_time(0xFE).unwrap();
        let (mut i2c, _) = bh.release();
        i2c.done();
    }

    #[test]
    fn lux_conversion() {
        assert_eq!(raw_to_lux(0), 0.0);
        assert_eq!(raw_to_lux(12), 10.0);
    }
}
