//! Sensirion CRC-8 over the 2-byte words used by the SPS30 I2C protocol.

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

/// Size of a word on the wire: two data bytes followed by their checksum
pub const WORD_SIZE: usize = 3;

/// Compute the CRC-8 (polynomial 0x31, init 0xFF, no reflection, no final xor) of `data`
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = CRC8_INIT;

    for &b in data {
        crc ^= b;
        for _ in 0..8 {
            crc = if (crc & 0x80) != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }

    crc
}

/// Build a wire word from two data bytes
pub fn word(data: [u8; 2]) -> [u8; WORD_SIZE] {
    [data[0], data[1], crc8(&data)]
}

/// A received word whose trailing byte did not match the checksum of its data bytes
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrcError {
    /// Index of the failing word within the frame
    pub word: usize,
    /// Checksum byte as received from the sensor
    pub received: u8,
    /// Checksum computed over the received data bytes
    pub computed: u8,
}

/// Check a single received word, returning its two data bytes
pub fn verify_word(index: usize, word: &[u8; WORD_SIZE]) -> Result<[u8; 2], CrcError> {
    let data = [word[0], word[1]];
    let computed = crc8(&data);
    if computed == word[2] {
        Ok(data)
    } else {
        Err(CrcError {
            word: index,
            received: word[2],
            computed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_vector() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn all_zero_and_all_ones() {
        // crc of two zero bytes, init 0xff
        assert_eq!(crc8(&[0x00, 0x00]), 0x81);
        assert_eq!(crc8(&[0xFF, 0xFF]), 0xAC);
        assert_ne!(crc8(&[0x00, 0x00]), 0x00);
    }

    #[test]
    fn start_measurement_payload() {
        // float format byte + reserved zero
        assert_eq!(crc8(&[0x03, 0x00]), 0xAC);
        assert_eq!(crc8(&[0x05, 0x00]), 0xF6);
    }

    #[test]
    fn verify_rejects_bad_checksum() {
        let mut w = word([0x12, 0x34]);
        assert_eq!(verify_word(0, &w), Ok([0x12, 0x34]));
        w[1] ^= 0x01;
        let err = verify_word(3, &w).unwrap_err();
        assert_eq!(err.word, 3);
        assert_eq!(err.received, crc8(&[0x12, 0x34]));
        assert_eq!(err.computed, crc8(&[0x12, 0x35]));
    }
}
