//! DHT20 Sensor Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for the DHT20 (AHT20) I2C temperature
//! and humidity sensor, built on top of the [`embedded-hal`] traits.
//!
//! # Features
//! - Blocking synchronous API using `embedded-hal` traits
//! - Designed for `no_std` environments
//! - CRC-8 checked measurements
//! - Per-axis calibration offsets applied at read time
//! - Optional logging support via `defmt`
//!
//! # Dependencies
//! This driver depends on the following `embedded-hal` traits:
//! - [`I2c`] for talking to the sensor at address `0x38`
//! - [`DelayNs`] for the fixed waits the sensor needs
//!
//! It also needs a monotonic millisecond counter, provided through the [`Clock`] trait
//! of this crate.
//!
//! # Usage
//! ```ignore
//! let mut dht = Dht20::new(i2c, delay, clock);
//! dht.init()?;
//! let reading = dht.get_measurement()?;
//! ```
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` for logging support and logs failed resets,
//!   busy timeouts and checksum mismatches
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`I2c`]: embedded_hal::i2c::I2c
//! [`DelayNs`]: embedded_hal::delay::DelayNs

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod dht20;
pub mod error;
pub mod protocol;

pub use clock::Clock;
pub use dht20::{Dht20, Reading};
pub use error::DhtError;
