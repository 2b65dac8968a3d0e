//! Command table and frame layout of the SPS30 I2C protocol.
//!
//! Every transfer starts with a 2-byte big-endian pointer selecting the command. Data travels in
//! words of two bytes followed by a CRC-8 of those two bytes.

use crate::crc::{self, CrcError, WORD_SIZE};
use arrayvec::ArrayVec;

/// Most words the sensor sends back for a single command (10 floats, 2 words each)
pub const MAX_READ_WORDS: usize = 20;

/// Most bytes read in a single transfer
pub const MAX_READ_SIZE: usize = MAX_READ_WORDS * WORD_SIZE;

/// Most data bytes left once checksums are stripped from a read
pub const MAX_DATA_SIZE: usize = MAX_READ_WORDS * 2;

/// Most data words carried by a single write
pub const MAX_WRITE_WORDS: usize = 2;

/// Most bytes written in a single transfer: pointer plus data words
pub const MAX_WRITE_SIZE: usize = 2 + MAX_WRITE_WORDS * WORD_SIZE;

/// How a command moves data over the bus
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transfer {
    /// Only the pointer is written
    Pointer,
    /// The pointer is followed by data words in the same write
    PointerWrite,
    /// The pointer is written, then words are read back
    PointerRead,
    /// Either of the above depending on the direction
    ReadWrite,
}

/// SPS30 commands, valued by their pointer
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Command {
    StartMeasurement = 0x0010,
    StopMeasurement = 0x0104,
    ReadDataReady = 0x0202,
    ReadMeasuredValues = 0x0300,
    Sleep = 0x1001,
    WakeUp = 0x1103,
    StartFanCleaning = 0x5607,
    AutoCleaningInterval = 0x8004,
    ReadProductType = 0xD002,
    ReadSerialNumber = 0xD033,
    ReadVersion = 0xD100,
    ReadDeviceStatus = 0xD206,
    ClearDeviceStatus = 0xD210,
    Reset = 0xD304,
}

impl Command {
    /// The pointer bytes, most significant first
    pub fn pointer(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }

    pub fn transfer(self) -> Transfer {
        match self {
            Command::StartMeasurement => Transfer::PointerWrite,
            Command::StopMeasurement
            | Command::Sleep
            | Command::WakeUp
            | Command::StartFanCleaning
            | Command::ClearDeviceStatus
            | Command::Reset => Transfer::Pointer,
            Command::AutoCleaningInterval => Transfer::ReadWrite,
            Command::ReadDataReady
            | Command::ReadMeasuredValues
            | Command::ReadProductType
            | Command::ReadSerialNumber
            | Command::ReadVersion
            | Command::ReadDeviceStatus => Transfer::PointerRead,
        }
    }

    /// Time in milliseconds the sensor needs before it accepts the next command
    pub fn execution_time_ms(self) -> u16 {
        match self {
            Command::StartMeasurement | Command::StopMeasurement => 20,
            Command::AutoCleaningInterval => 20,
            Command::Sleep | Command::WakeUp | Command::ClearDeviceStatus => 5,
            Command::StartFanCleaning => 10_000,
            Command::Reset => 100,
            _ => 0,
        }
    }
}

/// A pointer-only frame
pub fn encode_pointer(command: Command) -> ArrayVec<u8, MAX_WRITE_SIZE> {
    let mut frame = ArrayVec::new();
    frame.extend(command.pointer());
    frame
}

/// A pointer followed by one word per entry of `data`
///
/// Returns `None` for commands that take no data, or when more than [`MAX_WRITE_WORDS`] words
/// are given.
pub fn encode_write(command: Command, data: &[[u8; 2]]) -> Option<ArrayVec<u8, MAX_WRITE_SIZE>> {
    match command.transfer() {
        Transfer::PointerWrite | Transfer::ReadWrite => {}
        Transfer::Pointer | Transfer::PointerRead => return None,
    }
    if data.len() > MAX_WRITE_WORDS {
        return None;
    }
    let mut frame = encode_pointer(command);
    for &bytes in data {
        frame.extend(crc::word(bytes));
    }
    Some(frame)
}

/// A received frame that could not be decoded
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// A word failed its checksum
    Crc(CrcError),
    /// The frame does not hold the expected whole number of words, carries its length
    Length(usize),
}

impl From<CrcError> for FrameError {
    fn from(e: CrcError) -> Self {
        FrameError::Crc(e)
    }
}

fn split_word(chunk: &[u8]) -> [u8; WORD_SIZE] {
    [chunk[0], chunk[1], chunk[2]]
}

/// Check every word of a received frame and collect the data bytes
///
/// The first word with a bad checksum aborts decoding. Frames with a partial word or more than
/// [`MAX_READ_WORDS`] words are rejected.
pub fn strip_checksums(frame: &[u8]) -> Result<ArrayVec<u8, MAX_DATA_SIZE>, FrameError> {
    if frame.len() % WORD_SIZE != 0 || frame.len() > MAX_READ_SIZE {
        return Err(FrameError::Length(frame.len()));
    }
    let mut data = ArrayVec::new();
    for (index, chunk) in frame.chunks_exact(WORD_SIZE).enumerate() {
        data.extend(crc::verify_word(index, &split_word(chunk))?);
    }
    Ok(data)
}

/// Check a frame of exactly `N` words, returning their data bytes
pub(crate) fn words<const N: usize>(frame: &[u8]) -> Result<[[u8; 2]; N], FrameError> {
    if frame.len() != N * WORD_SIZE {
        return Err(FrameError::Length(frame.len()));
    }
    let mut out = [[0u8; 2]; N];
    for (index, (slot, chunk)) in out
        .iter_mut()
        .zip(frame.chunks_exact(WORD_SIZE))
        .enumerate()
    {
        *slot = crc::verify_word(index, &split_word(chunk))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_is_big_endian() {
        assert_eq!(Command::Reset.pointer(), [0xD3, 0x04]);
        assert_eq!(&encode_pointer(Command::StopMeasurement)[..], &[0x01, 0x04]);
    }

    #[test]
    fn write_frame_appends_word_checksums() {
        let frame = encode_write(Command::StartMeasurement, &[[0x03, 0x00]]).unwrap();
        assert_eq!(&frame[..], &[0x00, 0x10, 0x03, 0x00, 0xAC]);

        let frame =
            encode_write(Command::AutoCleaningInterval, &[[0x00, 0x00], [0xBE, 0xEF]]).unwrap();
        assert_eq!(&frame[..], &[0x80, 0x04, 0x00, 0x00, 0x81, 0xBE, 0xEF, 0x92]);
    }

    #[test]
    fn write_frame_rejects_too_many_words() {
        assert!(encode_write(Command::AutoCleaningInterval, &[[0, 0]; 3]).is_none());
    }

    #[test]
    fn strip_stops_at_first_bad_word() {
        let mut frame = [0u8; 9];
        frame[..3].copy_from_slice(&crc::word([b'S', b'E']));
        frame[3..6].copy_from_slice(&crc::word([b'N', b'5']));
        frame[6..].copy_from_slice(&crc::word([b'0', 0]));
        assert_eq!(&strip_checksums(&frame).unwrap()[..], b"SEN50\0");

        frame[4] = b'6';
        match strip_checksums(&frame) {
            Err(FrameError::Crc(e)) => assert_eq!(e.word, 1),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn partial_words_are_rejected() {
        let frame = crc::word([0x12, 0x34]);
        assert_eq!(strip_checksums(&frame[..2]), Err(FrameError::Length(2)));
        assert_eq!(words::<1>(&[]), Err(FrameError::Length(0)));
        assert_eq!(words::<2>(&frame), Err(FrameError::Length(3)));
        assert_eq!(words::<1>(&frame), Ok([[0x12, 0x34]]));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let frame = [0u8; MAX_READ_SIZE + WORD_SIZE];
        assert_eq!(
            strip_checksums(&frame),
            Err(FrameError::Length(MAX_READ_SIZE + WORD_SIZE))
        );
    }

    #[test]
    fn write_frame_only_for_commands_that_take_data() {
        assert!(encode_write(Command::Reset, &[[0, 0]]).is_none());
        assert!(encode_write(Command::ReadVersion, &[[0, 0]]).is_none());
        assert!(encode_write(Command::AutoCleaningInterval, &[[0, 0], [0, 0]]).is_some());
    }

    #[test]
    fn transfer_shapes() {
        assert_eq!(Command::StartMeasurement.transfer(), Transfer::PointerWrite);
        assert_eq!(Command::WakeUp.transfer(), Transfer::Pointer);
        assert_eq!(Command::ReadSerialNumber.transfer(), Transfer::PointerRead);
        assert_eq!(Command::AutoCleaningInterval.transfer(), Transfer::ReadWrite);
    }
}
