//! Runtime configuration, read from an optional TOML file.
//!
//! Every key has a default, so an empty file (or no file at all) yields the
//! stock setup: DHT22 on BCM pin 4, polled every 2.5 s, served on port 16664.

use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::dht::SensorModel;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub sensor: SensorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub host: String,
    pub port: u16,
    pub application_name: String,
    pub application_uri: String,
    /// Where the server keeps (and if missing, creates) its certificate.
    pub pki_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 16664,
            application_name: "DHT22 OPC UA Server".into(),
            application_uri: "urn:dht22-opcua".into(),
            pki_dir: PathBuf::from("pki"),
        }
    }
}

/// Source of the readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Bit-banged sensor on a Raspberry Pi GPIO line.
    #[default]
    Gpio,
    /// Synthetic readings, no hardware needed.
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    pub driver: DriverKind,
    pub model: SensorModel,
    /// BCM numbering.
    pub gpio_pin: u8,
    pub poll_interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Gpio,
            model: SensorModel::Dht22,
            gpio_pin: 4,
            poll_interval_ms: 2500,
        }
    }
}

impl Config {
    /// Names a configuration file when none is given on the command line.
    pub const PATH_ENV: &'static str = "DHT22_OPCUA_CONFIG";

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                key: "server.port",
                reason: "must be a fixed port",
            });
        }
        if self.sensor.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "sensor.poll_interval_ms",
                reason: "must be greater than zero",
            });
        }

        let min = self.sensor.model.min_interval_ms();
        if self.sensor.driver == DriverKind::Gpio && self.sensor.poll_interval_ms < min {
            warn!(
                "poll interval {} ms is below the {:?} minimum of {} ms; expect failed reads",
                self.sensor.poll_interval_ms, self.sensor.model, min
            );
        }
        Ok(())
    }

    /// The URL clients use to reach the server.
    pub fn endpoint_url(&self) -> String {
        format!("opc.tcp://{}:{}/", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 16664);
        assert_eq!(config.sensor.gpio_pin, 4);
        assert_eq!(config.sensor.poll_interval_ms, 2500);
        assert_eq!(config.sensor.model, SensorModel::Dht22);
        assert_eq!(config.sensor.driver, DriverKind::Gpio);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 4840

            [sensor]
            driver = "simulated"
            model = "dht11"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4840);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.sensor.driver, DriverKind::Simulated);
        assert_eq!(config.sensor.model, SensorModel::Dht11);
        assert_eq!(config.sensor.gpio_pin, 4);
        assert_eq!(config.endpoint_url(), "opc.tcp://0.0.0.0:4840/");
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for (text, key) in [
            ("[server]\nport = 0", "server.port"),
            ("[sensor]\npoll_interval_ms = 0", "sensor.poll_interval_ms"),
        ] {
            match Config::from_toml(text) {
                Err(ConfigError::Invalid { key: k, .. }) => assert_eq!(k, key),
                other => panic!("expected invalid {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_keys_and_variants_fail_to_parse() {
        assert!(matches!(
            Config::from_toml("[sensor]\ndriver = \"spi\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml("[sensor]\npin = 17"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Config::load("/nonexistent/dht22-opcua.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
