//! DHT22 readings over OPC UA
//!
//! This crate polls a DHT22 (AM2302) temperature and humidity sensor on a
//! fixed interval and serves the latest reading as two OPC UA variables,
//! `ns=1;s=temperature` and `ns=1;s=humidity`, readable by any OPC UA client.
//!
//! # Layout
//! - [`dht`]: platform-agnostic bit-banged driver built on [`embedded-hal`]
//! - [`reading`]: the shared snapshot of the last poll
//! - [`poll`]: the periodic poll task and the [`Sensor`] seam
//! - [`variable`]: mapping a snapshot to a client read
//! - [`server`]: registration with the [`opcua`] server
//! - [`gpio`]: Raspberry Pi pin and delay adapters (`rpi` feature)
//! - [`config`]: the optional TOML configuration file
//! - [`error`]: driver, configuration and server errors
//!
//! A failed poll never stops the server. It is stored as a [`PollStatus`]
//! and reported to clients as a bad status code on an otherwise normal read.
//!
//! # Optional Features
//! - `rpi` (default): drive the sensor through `rppal`
//! - `defmt`: Implements `defmt::Format` for the public data types
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal

pub mod config;
pub mod dht;
pub mod error;
pub mod gpio;
pub mod poll;
pub mod reading;
pub mod server;
pub mod variable;

pub use config::{Config, DriverKind};
pub use dht::{Dht, Measurement, SensorModel};
pub use error::{ConfigError, DhtError, ServerError, UnknownSelector};
pub use poll::{PollTask, Sensor, SimulatedSensor};
pub use reading::{PollStatus, ReadingStore, Snapshot};
pub use server::{SensorServer, ShutdownHandle};
pub use variable::{Quantity, ReadStatus, VariableRead, VariableSource};
