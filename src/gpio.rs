//! Linux host glue for driving the sensor from user space.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

/// Busy-waiting delay for microsecond bus timing.
///
/// `thread::sleep` overshoots by tens of microseconds on Linux, more than a
/// whole DHT bit, so sub-millisecond waits spin on the monotonic clock.
/// Millisecond waits are slack enough to sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let deadline = Instant::now() + Duration::from_nanos(ns.into());
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}

#[cfg(feature = "rpi")]
pub use rpi::{OpenDrainPin, RpiDht};

#[cfg(feature = "rpi")]
mod rpi {
    use core::convert::Infallible;

    use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
    use log::{debug, info, warn};
    use rppal::gpio::{Gpio, IoPin, Mode, Bias};

    use super::SpinDelay;
    use crate::dht::{Dht, Measurement, SensorModel};
    use crate::poll::Sensor;
    use crate::reading::PollStatus;

    /// Emulates an open-drain line on a push-pull GPIO.
    ///
    /// Low drives the line; high switches to input and lets the pull-up
    /// (and the sensor) own it.
    pub struct OpenDrainPin {
        pin: IoPin,
    }

    impl OpenDrainPin {
        pub fn new(mut pin: IoPin) -> Self {
            pin.set_bias(Bias::PullUp);
            pin.set_mode(Mode::Input);
            Self { pin }
        }
    }

    impl ErrorType for OpenDrainPin {
        type Error = Infallible;
    }

    impl OutputPin for OpenDrainPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            // Latch the level before enabling the driver to avoid a high glitch.
            self.pin.set_low();
            self.pin.set_mode(Mode::Output);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.pin.set_mode(Mode::Input);
            Ok(())
        }
    }

    impl InputPin for OpenDrainPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.pin.is_high())
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(self.pin.is_low())
        }
    }

    /// DHT sensor on a Raspberry Pi BCM pin.
    ///
    /// The GPIO is claimed on the first poll, not at construction, so a
    /// missing `/dev/gpiomem` or a busy pin becomes a communication error on
    /// the variables instead of a startup failure. Claiming is retried on
    /// every poll until it succeeds.
    pub struct RpiDht {
        bcm_pin: u8,
        model: SensorModel,
        dht: Option<Dht<OpenDrainPin, SpinDelay>>,
        claim_failed: bool,
    }

    impl RpiDht {
        pub fn new(bcm_pin: u8, model: SensorModel) -> Self {
            Self {
                bcm_pin,
                model,
                dht: None,
                claim_failed: false,
            }
        }

        fn claim(&self) -> Result<Dht<OpenDrainPin, SpinDelay>, rppal::gpio::Error> {
            let pin = Gpio::new()?.get(self.bcm_pin)?.into_io(Mode::Input);
            Ok(Dht::new(OpenDrainPin::new(pin), SpinDelay, self.model))
        }
    }

    impl Sensor for RpiDht {
        fn measure(&mut self) -> Result<Measurement, PollStatus> {
            let dht = match self.dht.take() {
                Some(dht) => dht,
                None => match self.claim() {
                    Ok(dht) => {
                        info!("claimed GPIO{} for {:?}", self.bcm_pin, self.model);
                        self.claim_failed = false;
                        dht
                    }
                    Err(e) => {
                        if self.claim_failed {
                            debug!("GPIO{} still unavailable: {e}", self.bcm_pin);
                        } else {
                            warn!("cannot claim GPIO{}: {e}", self.bcm_pin);
                            self.claim_failed = true;
                        }
                        return Err(PollStatus::CommunicationError);
                    }
                },
            };
            self.dht.insert(dht).measure()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_delay_waits_at_least_requested() {
        let mut delay = SpinDelay;

        let start = Instant::now();
        delay.delay_us(200);
        assert!(start.elapsed() >= Duration::from_micros(200));

        let start = Instant::now();
        delay.delay_ms(2);
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
