//! Wire-level constants and pure helpers for the DHT20.
//!
//! Command bytes and status bits come from the Aosong AHT20/DHT20 datasheet.

use crc::{CRC_8_NRSC_5, Crc};

/// 7-bit I2C address of the sensor. It cannot be changed.
pub const ADDRESS: u8 = 0x38;

/// First step of the calibration reset sequence.
pub const RESET_1: [u8; 3] = [0x1B, 0x00, 0x00];
/// Second step of the calibration reset sequence.
pub const RESET_2: [u8; 3] = [0x1C, 0x00, 0x00];
/// Third step of the calibration reset sequence.
pub const RESET_3: [u8; 3] = [0x1E, 0x00, 0x00];
/// Starts a single temperature and humidity measurement.
pub const TRIGGER_MEASUREMENT: [u8; 3] = [0xAC, 0x33, 0x00];

/// Status bit set while a measurement is in progress.
pub const STATUS_BUSY: u8 = 0x80;
/// Status bit set once the sensor is calibrated.
pub const STATUS_CALIBRATED: u8 = 0x08;
/// Both bits must be set or the init sequence resets the calibration registers.
pub const STATUS_CALIBRATION_READY: u8 = 0x18;

/// Length of a measurement payload: status, five data bytes, CRC.
pub const PAYLOAD_LEN: usize = 7;

/// Wait after power-up before the first status poll.
pub const POWER_UP_DELAY_MS: u32 = 100;
/// Wait after a reset sequence before polling the status again.
pub const RESET_DELAY_MS: u32 = 100;
/// How many reset sequences `init` tries.
pub const RESET_ATTEMPTS: usize = 3;
/// Wait between triggering a measurement and the first read.
pub const MEASUREMENT_DELAY_MS: u32 = 50;
/// Maximum number of reads while the sensor reports busy.
pub const READ_ATTEMPTS: usize = 5;
/// Back-off between busy reads.
pub const BUSY_DELAY_MS: u32 = 10;
/// Minimum time between two completed reads.
pub const MIN_READ_INTERVAL_MS: u32 = 1000;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// 2^20, full scale of the 20-bit raw values.
const FULL_SCALE: f32 = 1_048_576.0;

/// Computes the payload checksum.
///
/// CRC-8 with polynomial 0x31, initial value 0xFF, MSB first and no final XOR.
pub fn crc8(bytes: &[u8]) -> u8 {
    CRC8.checksum(bytes)
}

/// Extracts the 20-bit raw humidity and temperature values from a payload.
///
/// Humidity is bytes 1, 2 and the high nibble of byte 3. Temperature is the low
/// nibble of byte 3 followed by bytes 4 and 5.
pub(crate) fn raw_values(payload: &[u8; PAYLOAD_LEN]) -> (u32, u32) {
    let humidity =
        (u32::from(payload[1]) << 12) | (u32::from(payload[2]) << 4) | u32::from(payload[3] >> 4);
    let temperature = (u32::from(payload[3] & 0x0F) << 16)
        | (u32::from(payload[4]) << 8)
        | u32::from(payload[5]);
    (humidity, temperature)
}

/// Converts a payload into relative humidity (%) and temperature (°C).
pub fn decode(payload: &[u8; PAYLOAD_LEN]) -> (f32, f32) {
    let (raw_humidity, raw_temperature) = raw_values(payload);
    let humidity = raw_humidity as f32 * (100.0 / FULL_SCALE);
    let temperature = raw_temperature as f32 * (200.0 / FULL_SCALE) - 50.0;
    (humidity, temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_catalogue_check_value() {
        assert_eq!(crc8(b"123456789"), 0xF7);
    }

    #[test]
    fn test_crc_all_zero() {
        assert_eq!(crc8(&[0x00; 6]), 0x6A);
    }

    #[test]
    fn test_crc_recorded_payload() {
        // Taken from a real sensor read
        let bytes = [0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x26];
        assert_eq!(crc8(&bytes), 0xC6);
    }

    #[test]
    fn test_crc_detects_single_bit_flips() {
        let bytes = [0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x26];
        let reference = crc8(&bytes);

        for byte in 0..bytes.len() {
            for bit in 0..8 {
                let mut flipped = bytes;
                flipped[byte] ^= 1 << bit;
                assert_ne!(crc8(&flipped), reference, "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn test_raw_values_split_nibble() {
        let payload = [0x1C, 0xAB, 0xCD, 0xE1, 0x23, 0x45, 0x00];
        assert_eq!(raw_values(&payload), (0xABCDE, 0x12345));
    }

    #[test]
    fn test_decode_zero() {
        let payload = [0x1C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x58];
        assert_eq!(decode(&payload), (0.0, -50.0));
    }

    #[test]
    fn test_decode_midscale() {
        // Humidity 0x80000 -> 50%, temperature 0x80000 -> 50C
        let payload = [0x18, 0x80, 0x00, 0x08, 0x00, 0x00, 0xD4];
        assert_eq!(decode(&payload), (50.0, 50.0));
    }

    #[test]
    fn test_decode_full_scale() {
        let payload = [0x18, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x17];
        let (humidity, temperature) = decode(&payload);

        assert!(humidity < 100.0);
        assert!((humidity - 100.0).abs() < 0.001);
        assert!(temperature < 150.0);
        assert!((temperature - 150.0).abs() < 0.001);
    }
}
