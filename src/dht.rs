use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use serde::Deserialize;

use crate::error::DhtError;

/// Maximum number of 1us polls spent waiting for the data line to change level.
const LEVEL_TIMEOUT_US: u8 = 100;

/// How long the host holds the line high after the start pulse, in microseconds.
const RELEASE_US: u32 = 40;

/// Sampling point after the rising edge of a data bit.
///
/// A `0` bit stays high for ~26us and a `1` bit for ~70us, so the level at
/// 35us tells them apart.
const BIT_SAMPLE_US: u32 = 35;

/// Sensor family on the data line.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorModel {
    /// DHT11, integer resolution.
    Dht11,
    /// DHT22 / AM2302, 0.1 resolution.
    #[default]
    Dht22,
}

impl SensorModel {
    /// Length of the low start pulse the host must send, in milliseconds.
    pub const fn start_pulse_ms(self) -> u32 {
        match self {
            SensorModel::Dht11 => 18,
            SensorModel::Dht22 => 1,
        }
    }

    /// Shortest interval between two conversions the sensor supports.
    pub const fn min_interval_ms(self) -> u64 {
        match self {
            SensorModel::Dht11 => 1000,
            SensorModel::Dht22 => 2000,
        }
    }

    /// Decodes the four payload bytes of a frame whose checksum has been verified.
    pub fn decode(self, payload: [u8; 4]) -> Measurement {
        match self {
            SensorModel::Dht11 => {
                let [hum_int, hum_dec, temp_int, temp_dec] = payload;

                // Newer parts flag sub-zero readings in bit 7 of the decimal byte.
                let magnitude = temp_int as f32 + (temp_dec & 0x7F) as f32 / 10.0;
                let temperature = if temp_dec & 0x80 != 0 {
                    -magnitude
                } else {
                    magnitude
                };

                Measurement {
                    humidity: hum_int as f32 + hum_dec as f32 / 10.0,
                    temperature,
                }
            }
            SensorModel::Dht22 => {
                let [hum_hi, hum_lo, temp_hi, temp_lo] = payload;
                let humidity = u16::from_be_bytes([hum_hi, hum_lo]) as f32 / 10.0;

                // Sign-magnitude: bit 15 of the temperature word is the sign.
                let magnitude = u16::from_be_bytes([temp_hi & 0x7F, temp_lo]) as f32 / 10.0;
                let temperature = if temp_hi & 0x80 != 0 {
                    -magnitude
                } else {
                    magnitude
                };

                Measurement {
                    humidity,
                    temperature,
                }
            }
        }
    }
}

/// One successful conversion.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Measurement {
    /// Relative humidity in percent.
    pub humidity: f32,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
}

/// Bit-banged driver for the DHT single-wire bus.
///
/// The pin must behave as open drain: `set_high` releases the line to the
/// pull-up so the sensor can drive it.
pub struct Dht<PIN, D> {
    pin: PIN,
    delay: D,
    model: SensorModel,
}

impl<PIN, D, E> Dht<PIN, D>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
{
    pub fn new(pin: PIN, delay: D, model: SensorModel) -> Self {
        Dht { pin, delay, model }
    }

    /// Runs one complete transaction on the bus.
    ///
    /// Sends the start pulse, waits for the sensor's response, clocks in the
    /// 40-bit frame and verifies the trailing checksum byte.
    ///
    /// # Errors
    ///
    /// * `DhtError::Timeout` if the sensor stops responding mid-frame
    /// * `DhtError::ChecksumMismatch` if the frame is corrupted
    /// * `DhtError::PinError` if the GPIO itself fails
    pub fn read(&mut self) -> Result<Measurement, DhtError<E>> {
        self.send_start()?;

        let mut frame = [0u8; 5];
        for byte in frame.iter_mut() {
            *byte = self.read_byte()?;
        }

        let [b0, b1, b2, b3, checksum] = frame;
        let payload = [b0, b1, b2, b3];
        let sum = payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != checksum {
            return Err(DhtError::ChecksumMismatch);
        }

        Ok(self.model.decode(payload))
    }

    fn send_start(&mut self) -> Result<(), DhtError<E>> {
        self.pin.set_low()?;
        self.delay.delay_ms(self.model.start_pulse_ms());
        self.pin.set_high()?;
        self.delay.delay_us(RELEASE_US);

        // Response: ~80us low, then ~80us high.
        self.await_level(false)?;
        self.await_level(true)?;
        Ok(())
    }

    /// Clocks in eight bits, MSB first.
    fn read_byte(&mut self) -> Result<u8, DhtError<E>> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | u8::from(self.read_bit()?);
        }
        Ok(byte)
    }

    /// Every bit starts with a ~50us low; its value is encoded in the length
    /// of the following high.
    fn read_bit(&mut self) -> Result<bool, DhtError<E>> {
        self.await_level(false)?;
        self.await_level(true)?;

        self.delay.delay_us(BIT_SAMPLE_US);
        let is_one = self.pin.is_high()?;

        self.await_level(false)?;
        Ok(is_one)
    }

    fn await_level(&mut self, high: bool) -> Result<(), DhtError<E>> {
        for _ in 0..LEVEL_TIMEOUT_US {
            let reached = if high {
                self.pin.is_high()?
            } else {
                self.pin.is_low()?
            };
            if reached {
                return Ok(());
            }
            self.delay.delay_us(1);
        }
        Err(DhtError::Timeout)
    }
}
