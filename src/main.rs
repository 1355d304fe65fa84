use std::path::PathBuf;

use anyhow::Context;
use log::info;

use dht22_opcua::{Config, DriverKind, Sensor, SensorServer, SimulatedSensor};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let sensor = make_sensor(&config)?;

    let server = SensorServer::new(&config, sensor).context("building OPC UA server")?;

    let handle = server.shutdown_handle();
    ctrlc::set_handler(move || {
        info!("received ctrl-c");
        handle.shutdown();
    })
    .context("installing interrupt handler")?;

    server.run();
    info!("server stopped");
    Ok(())
}

/// First CLI argument, else `$DHT22_OPCUA_CONFIG`, else built-in defaults.
fn load_config() -> anyhow::Result<Config> {
    let path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(Config::PATH_ENV))
        .map(PathBuf::from);

    match path {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            Config::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

fn make_sensor(config: &Config) -> anyhow::Result<Box<dyn Sensor + Send>> {
    match config.sensor.driver {
        DriverKind::Simulated => {
            info!("using simulated sensor");
            Ok(Box::new(SimulatedSensor::default()))
        }
        #[cfg(feature = "rpi")]
        DriverKind::Gpio => {
            info!(
                "using {:?} on GPIO{}",
                config.sensor.model, config.sensor.gpio_pin
            );
            Ok(Box::new(dht22_opcua::gpio::RpiDht::new(
                config.sensor.gpio_pin,
                config.sensor.model,
            )))
        }
        #[cfg(not(feature = "rpi"))]
        DriverKind::Gpio => {
            anyhow::bail!("built without the `rpi` feature; set sensor.driver = \"simulated\"")
        }
    }
}
