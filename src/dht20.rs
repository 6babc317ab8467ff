use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};

use crate::clock::Clock;
use crate::error::DhtError;
use crate::protocol::{
    self, ADDRESS, BUSY_DELAY_MS, MEASUREMENT_DELAY_MS, MIN_READ_INTERVAL_MS, PAYLOAD_LEN,
    POWER_UP_DELAY_MS, READ_ATTEMPTS, RESET_1, RESET_2, RESET_3, RESET_ATTEMPTS, RESET_DELAY_MS,
    STATUS_BUSY, STATUS_CALIBRATED, STATUS_CALIBRATION_READY, TRIGGER_MEASUREMENT,
};

/// Driver for the DHT20 temperature and humidity sensor.
pub struct Dht20<I2C, D, C> {
    i2c: I2C,
    delay: D,
    clock: C,
    temperature: f32,
    humidity: f32,
    temperature_offset: f32,
    humidity_offset: f32,
    /// Status byte of the last completed read.
    status: u8,
    payload: [u8; PAYLOAD_LEN],
    checksum: u8,
    last_read: u32,
    last_request: u32,
    update_interval: u32,
    request_pending: bool,
}

/// Reading returned by the DHT20 sensor, with the calibration offsets applied.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub relative_humidity: f32,
}

impl<I2C, D, C> Dht20<I2C, D, C> {
    /// Creates a new instance of the DHT20 driver.
    ///
    /// The sensor is not touched until [`Dht20::init`] is called.
    ///
    /// # Arguments
    ///
    /// * `i2c` - The I2C bus the sensor is attached to.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    /// * `clock` - A monotonic millisecond counter.
    pub fn new(i2c: I2C, delay: D, clock: C) -> Self {
        Dht20 {
            i2c,
            delay,
            clock,
            temperature: 0.0,
            humidity: 0.0,
            temperature_offset: 0.0,
            humidity_offset: 0.0,
            status: 0,
            payload: [0; PAYLOAD_LEN],
            checksum: 0,
            last_read: 0,
            last_request: 0,
            update_interval: MIN_READ_INTERVAL_MS,
            request_pending: false,
        }
    }

    /// Destroys the driver and gives back the bus, delay and clock.
    pub fn release(self) -> (I2C, D, C) {
        (self.i2c, self.delay, self.clock)
    }

    /// Last converted temperature in °C plus the temperature offset.
    pub fn temperature(&self) -> f32 {
        self.temperature + self.temperature_offset
    }

    /// Last converted relative humidity in % plus the humidity offset.
    pub fn humidity(&self) -> f32 {
        self.humidity + self.humidity_offset
    }

    /// Both values of [`Dht20::temperature`] and [`Dht20::humidity`].
    pub fn reading(&self) -> Reading {
        Reading {
            temperature: self.temperature(),
            relative_humidity: self.humidity(),
        }
    }

    /// Sets the offset added to every temperature read. Stored values are not changed.
    pub fn set_temperature_offset(&mut self, offset: f32) {
        self.temperature_offset = offset;
    }

    /// Sets the offset added to every humidity read. Stored values are not changed.
    pub fn set_humidity_offset(&mut self, offset: f32) {
        self.humidity_offset = offset;
    }

    /// Offset currently added to temperature reads.
    pub fn temperature_offset(&self) -> f32 {
        self.temperature_offset
    }

    /// Offset currently added to humidity reads.
    pub fn humidity_offset(&self) -> f32 {
        self.humidity_offset
    }

    /// Status byte from the last converted payload. Does not poll the sensor,
    /// see [`Dht20::read_status`] for that.
    pub fn status(&self) -> u8 {
        self.status
    }

    /// Timestamp in ms of the last successful read, 0 if nothing was read yet.
    pub fn last_read(&self) -> u32 {
        self.last_read
    }

    /// Timestamp in ms of the last measurement trigger.
    pub fn last_request(&self) -> u32 {
        self.last_request
    }

    /// Raw bytes of the last bus read.
    pub fn raw_payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }

    /// Checksum computed by the last [`Dht20::convert`].
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Interval used by [`Dht20::update_measurement`].
    pub fn update_interval(&self) -> u32 {
        self.update_interval
    }

    /// Sets the interval used by [`Dht20::update_measurement`].
    ///
    /// Values below one second are raised to one second.
    pub fn set_update_interval(&mut self, interval_ms: u32) {
        self.update_interval = interval_ms.max(MIN_READ_INTERVAL_MS);
    }
}

impl<I2C, D, C, E> Dht20<I2C, D, C>
where
    I2C: I2c<SevenBitAddress, Error = E>,
    D: DelayNs,
    C: Clock,
{
    /// Initializes the sensor.
    ///
    /// Clears all stored state, waits for the sensor to power up and then
    /// resets its calibration registers until it reports itself calibrated.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the sensor is calibrated.
    /// * `Err(DhtError::ResetFailure)` if it is still uncalibrated after three resets.
    /// * `Err(DhtError::Connect)` on a bus error.
    pub fn init(&mut self) -> Result<(), DhtError<E>> {
        self.temperature = 0.0;
        self.humidity = 0.0;
        self.temperature_offset = 0.0;
        self.humidity_offset = 0.0;
        self.status = 0;
        self.payload = [0; PAYLOAD_LEN];
        self.checksum = 0;
        self.last_read = 0;
        self.last_request = 0;
        self.update_interval = MIN_READ_INTERVAL_MS;
        self.request_pending = false;

        self.delay.delay_ms(POWER_UP_DELAY_MS);

        for _ in 0..RESET_ATTEMPTS {
            self.reset_sensor()?;
            self.delay.delay_ms(RESET_DELAY_MS);
            if !self.needs_reset()? {
                return Ok(());
            }
            #[cfg(feature = "defmt")]
            defmt::debug!("DHT20 not calibrated after reset, retrying");
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("DHT20 reset failed after {} attempts", RESET_ATTEMPTS);
        Err(DhtError::ResetFailure)
    }

    /// Sends the trigger measurement command.
    ///
    /// Does not wait for the measurement, the sensor needs roughly 80 ms.
    pub fn start_measurement(&mut self) -> Result<(), DhtError<E>> {
        self.i2c.write(ADDRESS, &TRIGGER_MEASUREMENT)?;
        self.last_request = self.clock.now_ms();
        self.request_pending = true;
        Ok(())
    }

    /// Reads the 7 byte measurement payload.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the payload is ready. Call [`Dht20::convert`] next.
    /// * `Err(DhtError::Busy)` if the sensor is still measuring.
    /// * `Err(DhtError::AllZeroPayload)` if every byte was zero.
    /// * `Err(DhtError::Connect)` on a bus error.
    pub fn read_measurement(&mut self) -> Result<(), DhtError<E>> {
        let result = self.read_payload();
        if !matches!(result, Err(DhtError::Busy)) {
            self.request_pending = false;
        }
        result
    }

    fn read_payload(&mut self) -> Result<(), DhtError<E>> {
        self.i2c.read(ADDRESS, &mut self.payload)?;

        if self.payload[0] & STATUS_BUSY != 0 {
            return Err(DhtError::Busy);
        }
        if self.payload.iter().all(|&b| b == 0) {
            return Err(DhtError::AllZeroPayload);
        }

        self.last_read = self.clock.now_ms();
        Ok(())
    }

    /// Converts the last payload into temperature and humidity.
    ///
    /// The converted values are stored even when the checksum does not match,
    /// so [`Dht20::temperature`] and [`Dht20::humidity`] are only trustworthy
    /// after an `Ok`.
    pub fn convert(&mut self) -> Result<Reading, DhtError<E>> {
        self.status = self.payload[0];
        let (humidity, temperature) = protocol::decode(&self.payload);
        self.humidity = humidity;
        self.temperature = temperature;

        self.checksum = protocol::crc8(&self.payload[..PAYLOAD_LEN - 1]);
        if self.checksum != self.payload[PAYLOAD_LEN - 1] {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "DHT20 checksum mismatch: computed {=u8:#x}, received {=u8:#x}",
                self.checksum,
                self.payload[PAYLOAD_LEN - 1]
            );
            return Err(DhtError::ChecksumMismatch);
        }

        Ok(self.reading())
    }

    /// Takes a complete measurement, blocking until it is done.
    ///
    /// This performs the whole sequence: triggering the measurement, waiting
    /// 50 ms, reading the payload (up to five times while the sensor is busy)
    /// and converting it.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` if the read is successful and the checksum is valid.
    /// * `Err(DhtError::TooSoon)` if the previous read was less than a second ago.
    ///   Before the first read this is measured from 0, so the first second after
    ///   boot is refused too.
    /// * `Err(DhtError::Busy)` if the sensor was still busy after five reads.
    /// * Any other `Err(DhtError)` from the individual steps.
    pub fn get_measurement(&mut self) -> Result<Reading, DhtError<E>> {
        if self.clock.now_ms().wrapping_sub(self.last_read) < MIN_READ_INTERVAL_MS {
            return Err(DhtError::TooSoon);
        }

        self.start_measurement()?;
        self.delay.delay_ms(MEASUREMENT_DELAY_MS);
        self.read_until_ready()?;
        self.convert()
    }

    /// Non-blocking version of [`Dht20::get_measurement`], meant to be called
    /// periodically from a main loop.
    ///
    /// Triggers a measurement once the update interval has passed since the
    /// last read, and collects it on a later call once at least 50 ms passed.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Reading))` when a new measurement was converted.
    /// * `Ok(None)` when there is nothing new yet.
    /// * `Err(DhtError)` if a step failed. The pending request is dropped.
    pub fn update_measurement(&mut self) -> Result<Option<Reading>, DhtError<E>> {
        let now = self.clock.now_ms();

        if !self.request_pending {
            if now.wrapping_sub(self.last_read) >= self.update_interval {
                self.start_measurement()?;
            }
            return Ok(None);
        }

        if now.wrapping_sub(self.last_request) < MEASUREMENT_DELAY_MS {
            return Ok(None);
        }

        match self.read_measurement() {
            Ok(()) => self.convert().map(Some),
            Err(DhtError::Busy) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reads the sensor status byte.
    pub fn read_status(&mut self) -> Result<u8, DhtError<E>> {
        let mut status = [0u8; 1];
        self.i2c.read(ADDRESS, &mut status)?;
        Ok(status[0])
    }

    /// Polls the sensor and checks the calibrated bit.
    pub fn is_calibrated(&mut self) -> Result<bool, DhtError<E>> {
        Ok(self.read_status()? & STATUS_CALIBRATED == STATUS_CALIBRATED)
    }

    /// Polls the sensor and checks whether a measurement is in progress.
    pub fn is_measuring(&mut self) -> Result<bool, DhtError<E>> {
        Ok(self.read_status()? & STATUS_BUSY == STATUS_BUSY)
    }

    /// Polls the sensor and checks whether it is idle.
    pub fn is_idle(&mut self) -> Result<bool, DhtError<E>> {
        Ok(self.read_status()? & STATUS_BUSY == 0)
    }

    fn needs_reset(&mut self) -> Result<bool, DhtError<E>> {
        Ok(self.read_status()? & STATUS_CALIBRATION_READY != STATUS_CALIBRATION_READY)
    }

    /// Writes the three reset commands, unless the sensor is already calibrated.
    fn reset_sensor(&mut self) -> Result<(), DhtError<E>> {
        if self.needs_reset()? {
            self.i2c.write(ADDRESS, &RESET_1)?;
            self.i2c.write(ADDRESS, &RESET_2)?;
            self.i2c.write(ADDRESS, &RESET_3)?;
        }
        Ok(())
    }

    /// Reads until the sensor stops reporting busy, at most five times.
    fn read_until_ready(&mut self) -> Result<(), DhtError<E>> {
        let mut attempts = 0;
        loop {
            match self.read_measurement() {
                Err(DhtError::Busy) => {
                    attempts += 1;
                    if attempts == READ_ATTEMPTS {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("DHT20 still busy after {} reads", READ_ATTEMPTS);
                        return Err(DhtError::Busy);
                    }
                    self.delay.delay_ms(BUSY_DELAY_MS);
                }
                result => return result,
            }
        }
    }
}
