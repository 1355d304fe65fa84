//! Periodic sensor polling.

use chrono::{DateTime, Utc};
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use log::{debug, info, warn};

use crate::dht::{Dht, Measurement};
use crate::reading::{PollStatus, ReadingStore, Snapshot};

/// Something that can perform one blocking conversion.
///
/// Failures are reported as the [`PollStatus`] they will be recorded under;
/// a sensor never aborts the poll loop.
pub trait Sensor {
    fn measure(&mut self) -> Result<Measurement, PollStatus>;
}

impl<PIN, D, E> Sensor for Dht<PIN, D>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
{
    fn measure(&mut self) -> Result<Measurement, PollStatus> {
        self.read().map_err(|e| PollStatus::from(&e))
    }
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn measure(&mut self) -> Result<Measurement, PollStatus> {
        (**self).measure()
    }
}

/// Sensor stand-in for machines without a DHT attached.
///
/// Produces a slow, deterministic drift around a base point so clients see
/// values change between polls.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    base: Measurement,
    tick: u32,
}

impl SimulatedSensor {
    const PERIOD: u32 = 24;

    pub fn new(base: Measurement) -> Self {
        Self { base, tick: 0 }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new(Measurement {
            humidity: 45.0,
            temperature: 21.5,
        })
    }
}

impl Sensor for SimulatedSensor {
    fn measure(&mut self) -> Result<Measurement, PollStatus> {
        // Triangle wave in [-1.0, 1.0] with one cycle per PERIOD polls.
        let half = Self::PERIOD / 2;
        let phase = self.tick % Self::PERIOD;
        let rise = if phase <= half { phase } else { Self::PERIOD - phase };
        let offset = rise as f32 / half as f32 * 2.0 - 1.0;
        self.tick = self.tick.wrapping_add(1);

        Ok(Measurement {
            humidity: self.base.humidity + offset * 2.0,
            temperature: self.base.temperature + offset * 0.5,
        })
    }
}

/// Sole writer of the [`ReadingStore`].
pub struct PollTask<S> {
    sensor: S,
    store: ReadingStore,
}

impl<S: Sensor> PollTask<S> {
    pub fn new(sensor: S, store: ReadingStore) -> Self {
        Self { sensor, store }
    }

    /// Polls the sensor once and records the result with the current time.
    pub fn run(&mut self) {
        self.poll_at(Utc::now());
    }

    /// Polls the sensor once and records the result as captured at `at`.
    pub fn poll_at(&mut self, at: DateTime<Utc>) -> Snapshot {
        let previous = self.store.snapshot();
        let outcome = self.sensor.measure();
        let snapshot = self.store.record(at, outcome);

        // Only transitions are worth more than debug output.
        match snapshot.status {
            PollStatus::Success => {
                if previous.status != PollStatus::Success {
                    info!("sensor readings available");
                }
                debug!(
                    "polled sensor: {:.1} %RH, {:.1} C",
                    snapshot.humidity, snapshot.temperature
                );
            }
            status if previous.read_time.is_none() || previous.status == PollStatus::Success => {
                warn!("sensor poll failed: {status:?}")
            }
            status => debug!("sensor poll failed again: {status:?}"),
        }

        snapshot
    }
}
