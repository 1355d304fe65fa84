use std::fmt;

/// Possible errors from the DHT bus driver.
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// Timed out waiting for a pin state change.
    Timeout,
    /// Checksum did not match the received data.
    ChecksumMismatch,
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}

impl<E: fmt::Debug> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "sensor did not respond in time"),
            Self::ChecksumMismatch => write!(f, "frame checksum mismatch"),
            Self::PinError(e) => write!(f, "gpio error: {e:?}"),
        }
    }
}

/// A raw variable selector that names neither exposed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownSelector(pub u32);

impl fmt::Display for UnknownSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variable selector {}", self.0)
    }
}

impl std::error::Error for UnknownSelector {}

/// Error returned when the configuration file cannot be used.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read
    Io(std::io::Error),
    /// The file is not valid TOML or has mistyped keys
    Parse(toml::de::Error),
    /// A value is out of its allowed range
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read configuration: {e}"),
            Self::Parse(e) => write!(f, "malformed configuration: {e}"),
            Self::Invalid { key, reason } => write!(f, "invalid `{key}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Error returned when the OPC UA server cannot be assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// The server configuration was rejected by the stack
    InvalidServerConfig,
    /// A variable node could not be inserted into the address space
    NodeInsert(&'static str),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidServerConfig => write!(f, "server configuration is invalid"),
            Self::NodeInsert(name) => write!(f, "could not add variable `{name}` to the address space"),
        }
    }
}

impl std::error::Error for ServerError {}
