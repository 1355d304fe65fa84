//! The two exposed variables and how a client read is answered.

use chrono::{DateTime, Utc};

use crate::error::UnknownSelector;
use crate::reading::{PollStatus, ReadingStore, Snapshot};

/// Which field of the snapshot a variable exposes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    Temperature,
    Humidity,
}

impl Quantity {
    pub const ALL: [Quantity; 2] = [Quantity::Temperature, Quantity::Humidity];

    /// Node name, browse name and display name of the variable.
    pub const fn name(self) -> &'static str {
        match self {
            Quantity::Temperature => "temperature",
            Quantity::Humidity => "humidity",
        }
    }

    /// Raw selector value; the inverse of `TryFrom<u32>`.
    pub const fn selector(self) -> u32 {
        match self {
            Quantity::Temperature => 1,
            Quantity::Humidity => 2,
        }
    }

    pub fn value_in(self, snapshot: &Snapshot) -> f32 {
        match self {
            Quantity::Temperature => snapshot.temperature,
            Quantity::Humidity => snapshot.humidity,
        }
    }
}

impl TryFrom<u32> for Quantity {
    type Error = UnknownSelector;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Quantity::Temperature),
            2 => Ok(Quantity::Humidity),
            other => Err(UnknownSelector(other)),
        }
    }
}

/// Per-value quality reported to the client.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    Good,
    BadTimeout,
    BadCommunicationError,
    BadNotFound,
}

impl From<PollStatus> for ReadStatus {
    fn from(status: PollStatus) -> Self {
        match status {
            PollStatus::Success => ReadStatus::Good,
            PollStatus::Timeout => ReadStatus::BadTimeout,
            PollStatus::CommunicationError => ReadStatus::BadCommunicationError,
            PollStatus::Unknown => ReadStatus::BadNotFound,
        }
    }
}

/// Answer to one client read; a value copy independent of the store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VariableRead {
    pub value: f32,
    pub source_timestamp: Option<DateTime<Utc>>,
    pub status: ReadStatus,
}

impl VariableRead {
    pub fn from_snapshot(quantity: Quantity, snapshot: &Snapshot) -> Self {
        Self {
            value: quantity.value_in(snapshot),
            source_timestamp: snapshot.read_time,
            status: snapshot.status.into(),
        }
    }
}

/// Answers reads of one variable from the shared store.
///
/// Never fails: a bad poll only shows up in [`VariableRead::status`].
#[derive(Clone, Debug)]
pub struct VariableSource {
    quantity: Quantity,
    store: ReadingStore,
}

impl VariableSource {
    pub fn new(quantity: Quantity, store: ReadingStore) -> Self {
        Self { quantity, store }
    }

    pub fn read(&self) -> VariableRead {
        VariableRead::from_snapshot(self.quantity, &self.store.snapshot())
    }
}
