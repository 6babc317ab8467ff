/// Possible errors from the DHT20 driver.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// The sensor never reported itself calibrated after the reset attempts.
    ResetFailure,
    /// Error from the I2C bus while writing a command or reading data.
    Connect(E),
    /// The measurement is not ready yet. Retrying later is fine.
    Busy,
    /// All seven payload bytes were zero, usually a disconnected sensor.
    AllZeroPayload,
    /// Checksum did not match the received data.
    ChecksumMismatch,
    /// A measurement was requested less than a second after the previous read.
    TooSoon,
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::Connect(value)
    }
}
