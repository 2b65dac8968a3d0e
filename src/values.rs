//! Typed values decoded from SPS30 frames.

use crate::crc::WORD_SIZE;
use crate::frame::{self, strip_checksums, FrameError};
use crate::Error;
use arrayvec::ArrayVec;
use core::convert::TryFrom;

mod private {
    pub trait Sealed {}

    impl Sealed for super::Float {}

    impl Sealed for super::Integer {}
}

/// Wire representation of measured values, selected when starting a measurement
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputFormat {
    /// Big-endian IEEE754 floats
    Float = 0x03,
    /// Big-endian unsigned 16-bit integers
    Integer = 0x05,
}

/// A format byte the sensor does not know
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidFormat(pub u8);

impl<E> From<InvalidFormat> for Error<E> {
    fn from(_: InvalidFormat) -> Self {
        Error::InvalidArgument
    }
}

impl TryFrom<u8> for OutputFormat {
    type Error = InvalidFormat;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x03 => Ok(OutputFormat::Float),
            0x05 => Ok(OutputFormat::Integer),
            _ => Err(InvalidFormat(value)),
        }
    }
}

/// A set of readings as reported by the sensor
///
/// Mass concentrations are in µg/m³, number concentrations in #/cm³ and the typical particle
/// size in µm (or nm for the integer format).
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement<T> {
    /// Mass concentration PM1.0
    pub pm1_0: T,
    /// Mass concentration PM2.5
    pub pm2_5: T,
    /// Mass concentration PM4.0
    pub pm4_0: T,
    /// Mass concentration PM10
    pub pm10: T,
    /// Number concentration PM0.5
    pub nc0_5: T,
    /// Number concentration PM1.0
    pub nc1_0: T,
    /// Number concentration PM2.5
    pub nc2_5: T,
    /// Number concentration PM4.0
    pub nc4_0: T,
    /// Number concentration PM10
    pub nc10: T,
    pub typical_size: T,
}

impl<T: Copy> From<[T; 10]> for Measurement<T> {
    fn from(v: [T; 10]) -> Self {
        Measurement {
            pm1_0: v[0],
            pm2_5: v[1],
            pm4_0: v[2],
            pm10: v[3],
            nc0_5: v[4],
            nc1_0: v[5],
            nc2_5: v[6],
            nc4_0: v[7],
            nc10: v[8],
            typical_size: v[9],
        }
    }
}

impl<T: Copy> From<Measurement<T>> for [T; 10] {
    fn from(m: Measurement<T>) -> Self {
        [
            m.pm1_0,
            m.pm2_5,
            m.pm4_0,
            m.pm10,
            m.nc0_5,
            m.nc1_0,
            m.nc2_5,
            m.nc4_0,
            m.nc10,
            m.typical_size,
        ]
    }
}

/// Length of a float measurement frame: 10 values of 2 words
pub const FLOAT_FRAME_LEN: usize = 20 * WORD_SIZE;

/// Length of an integer measurement frame: 10 values of 1 word
pub const INTEGER_FRAME_LEN: usize = 10 * WORD_SIZE;

/// Decode a float measurement frame
///
/// Each value spans two words; the float bits are the data bytes of the first word followed by
/// those of the second, with both checksum bytes skipped.
pub fn decode_float(frame: &[u8]) -> Result<Measurement<f32>, FrameError> {
    let words = frame::words::<20>(frame)?;
    let mut values = [0f32; 10];
    for (value, pair) in values.iter_mut().zip(words.chunks_exact(2)) {
        let bits = u32::from_be_bytes([pair[0][0], pair[0][1], pair[1][0], pair[1][1]]);
        *value = f32::from_bits(bits);
    }
    Ok(values.into())
}

/// Decode an integer measurement frame
pub fn decode_integer(frame: &[u8]) -> Result<Measurement<u16>, FrameError> {
    let words = frame::words::<10>(frame)?;
    let mut values = [0u16; 10];
    for (value, word) in values.iter_mut().zip(words.iter()) {
        *value = u16::from_be_bytes(*word);
    }
    Ok(values.into())
}

/// Marker for float measurements
pub struct Float;

/// Marker for integer measurements
pub struct Integer;

/// Ties an [`OutputFormat`] to the type its readings decode into
pub trait MeasurementFormat: private::Sealed {
    type Value: Copy;

    const FORMAT: OutputFormat;

    const FRAME_LEN: usize;

    fn decode(frame: &[u8]) -> Result<Measurement<Self::Value>, FrameError>;
}

impl MeasurementFormat for Float {
    type Value = f32;
    const FORMAT: OutputFormat = OutputFormat::Float;
    const FRAME_LEN: usize = FLOAT_FRAME_LEN;

    fn decode(frame: &[u8]) -> Result<Measurement<f32>, FrameError> {
        decode_float(frame)
    }
}

impl MeasurementFormat for Integer {
    type Value = u16;
    const FORMAT: OutputFormat = OutputFormat::Integer;
    const FRAME_LEN: usize = INTEGER_FRAME_LEN;

    fn decode(frame: &[u8]) -> Result<Measurement<u16>, FrameError> {
        decode_integer(frame)
    }
}

/// Decode a 32-bit value carried in two words, high word first
pub fn decode_u32(frame: &[u8]) -> Result<u32, FrameError> {
    let [high, low] = frame::words::<2>(frame)?;
    Ok(u32::from_be_bytes([high[0], high[1], low[0], low[1]]))
}

/// Split a 32-bit value into the data bytes of two words, high word first
pub fn encode_u32(value: u32) -> [[u8; 2]; 2] {
    let b = value.to_be_bytes();
    [[b[0], b[1]], [b[2], b[3]]]
}

/// Decode the data-ready flag
pub fn decode_data_ready(frame: &[u8]) -> Result<bool, FrameError> {
    let [word] = frame::words::<1>(frame)?;
    Ok(word[1] == 0x01)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        let [word] = frame::words::<1>(frame)?;
        Ok(FirmwareVersion {
            major: word[0],
            minor: word[1],
        })
    }
}

/// The device status register
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus(pub u32);

impl DeviceStatus {
    const FAN_SPEED_WARNING: u32 = 1 << 21;
    const LASER_ERROR: u32 = 1 << 5;
    const FAN_ERROR: u32 = 1 << 4;

    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        decode_u32(frame).map(DeviceStatus)
    }

    /// Fan speed is too high or too low
    pub fn fan_speed_warning(self) -> bool {
        self.0 & Self::FAN_SPEED_WARNING != 0
    }

    /// Laser current out of range
    pub fn laser_error(self) -> bool {
        self.0 & Self::LASER_ERROR != 0
    }

    /// Fan is switched on but not turning
    pub fn fan_error(self) -> bool {
        self.0 & Self::FAN_ERROR != 0
    }
}

/// Most characters an identity string can hold
pub const MAX_IDENTITY_LEN: usize = 32;

/// Which identity string to read
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceInfo {
    ProductType,
    SerialNumber,
}

impl DeviceInfo {
    /// Buffer capacity for this string, including the terminator slot
    pub fn capacity(self) -> usize {
        match self {
            DeviceInfo::ProductType => 9,
            DeviceInfo::SerialNumber => 33,
        }
    }
}

/// Number of bytes to read for an identity string of `capacity` (terminator included)
///
/// This is `(capacity - 1) * 3 / 2` rounded up to whole words, so an odd character count never
/// leaves a partial word that cannot be checksummed. Clamped to the largest read the sensor
/// supports.
pub fn identity_read_len(capacity: usize) -> usize {
    let chars = capacity.saturating_sub(1).min(MAX_IDENTITY_LEN);
    ((chars + 1) / 2 * WORD_SIZE).min(frame::MAX_READ_SIZE)
}

/// An ASCII identification string read from the sensor
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct DeviceIdentity {
    bytes: ArrayVec<u8, MAX_IDENTITY_LEN>,
}

impl DeviceIdentity {
    /// Decode the identity string in `frame` into at most `capacity - 1` characters
    ///
    /// Every word is checksum-validated before any character is taken. Assembly stops at the
    /// first null byte or once the capacity is reached.
    pub fn decode(frame: &[u8], capacity: usize) -> Result<Self, FrameError> {
        let data = strip_checksums(frame)?;
        let limit = capacity.saturating_sub(1).min(MAX_IDENTITY_LEN);
        let bytes = data
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .take(limit)
            .collect();
        Ok(DeviceIdentity { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The string, if the sensor sent valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceIdentity {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=[u8]:a}", self.as_bytes())
    }
}
