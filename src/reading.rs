//! The last poll result and the store that shares it.
//!
//! The poll task is the only writer; every client read copies a whole
//! [`Snapshot`] out of the [`ReadingStore`], so a reader never sees fields
//! from two different polls.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::dht::Measurement;
use crate::error::DhtError;

/// Outcome of the most recent poll.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStatus {
    Success,
    /// The sensor stopped answering mid-transaction.
    Timeout,
    /// The GPIO line could not be acquired or driven.
    CommunicationError,
    /// Anything else, e.g. a corrupted frame.
    Unknown,
}

impl<E> From<&DhtError<E>> for PollStatus {
    fn from(err: &DhtError<E>) -> Self {
        match err {
            DhtError::Timeout => PollStatus::Timeout,
            DhtError::PinError(_) => PollStatus::CommunicationError,
            DhtError::ChecksumMismatch => PollStatus::Unknown,
        }
    }
}

/// The most recently recorded poll.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    /// When the poll was attempted; `None` until the first poll.
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub read_time: Option<DateTime<Utc>>,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    pub status: PollStatus,
}

impl Default for Snapshot {
    /// No poll has run yet, which reads as a communication error.
    fn default() -> Self {
        Self {
            read_time: None,
            humidity: 0.0,
            temperature: 0.0,
            status: PollStatus::CommunicationError,
        }
    }
}

impl Snapshot {
    /// Builds the snapshot that follows `self` after a poll at `at`.
    ///
    /// A failed poll keeps the previous readings and only updates the status
    /// and timestamp.
    pub fn next(&self, at: DateTime<Utc>, outcome: Result<Measurement, PollStatus>) -> Self {
        match outcome {
            Ok(m) => Self {
                read_time: Some(at),
                humidity: m.humidity,
                temperature: m.temperature,
                status: PollStatus::Success,
            },
            Err(status) => Self {
                read_time: Some(at),
                status,
                ..*self
            },
        }
    }
}

/// Shared handle to the single process-wide [`Snapshot`].
///
/// Clones refer to the same snapshot.
#[derive(Clone, Debug, Default)]
pub struct ReadingStore {
    current: Arc<RwLock<Snapshot>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        // The guarded value is plain `Copy` data; a panicked writer cannot
        // leave it half-written.
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the current snapshot as a whole.
    #[cfg(test)]
    fn publish(&self, snapshot: Snapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Applies one poll outcome and returns the snapshot that was stored.
    pub fn record(&self, at: DateTime<Utc>, outcome: Result<Measurement, PollStatus>) -> Snapshot {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = guard.next(at, outcome);
        *guard = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_starts_as_communication_error() {
        let store = ReadingStore::new();
        let snap = store.snapshot();
        assert_eq!(snap.status, PollStatus::CommunicationError);
        assert_eq!(snap.read_time, None);
        assert_eq!(snap.humidity, 0.0);
        assert_eq!(snap.temperature, 0.0);
    }

    #[test]
    fn test_driver_errors_map_to_poll_status() {
        assert_eq!(PollStatus::from(&DhtError::<()>::Timeout), PollStatus::Timeout);
        assert_eq!(
            PollStatus::from(&DhtError::PinError(())),
            PollStatus::CommunicationError
        );
        assert_eq!(
            PollStatus::from(&DhtError::<()>::ChecksumMismatch),
            PollStatus::Unknown
        );
    }

    #[test]
    fn test_success_replaces_every_field() {
        let store = ReadingStore::new();
        let m = Measurement {
            humidity: 45.2,
            temperature: 21.7,
        };
        store.record(at(100), Ok(m));

        assert_eq!(
            store.snapshot(),
            Snapshot {
                read_time: Some(at(100)),
                humidity: 45.2,
                temperature: 21.7,
                status: PollStatus::Success,
            }
        );
    }

    #[test]
    fn test_failure_keeps_previous_readings() {
        let store = ReadingStore::new();
        store.record(
            at(100),
            Ok(Measurement {
                humidity: 45.2,
                temperature: 21.7,
            }),
        );
        store.record(at(103), Err(PollStatus::Timeout));

        let snap = store.snapshot();
        assert_eq!(snap.status, PollStatus::Timeout);
        assert_eq!(snap.read_time, Some(at(103)));
        assert_eq!(snap.humidity, 45.2);
        assert_eq!(snap.temperature, 21.7);
    }

    #[test]
    fn test_clones_share_the_snapshot() {
        let writer = ReadingStore::new();
        let reader = writer.clone();
        writer.record(at(1), Err(PollStatus::Unknown));
        assert_eq!(reader.snapshot().status, PollStatus::Unknown);
    }

    // Every published snapshot has humidity == temperature == the second of
    // its timestamp. A reader mixing two polls would break that equality.
    #[test]
    fn test_concurrent_readers_never_see_torn_snapshots() {
        let store = ReadingStore::new();

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for i in 1..=20_000i64 {
                    store.publish(Snapshot {
                        read_time: Some(at(i)),
                        humidity: i as f32,
                        temperature: i as f32,
                        status: if i % 2 == 0 {
                            PollStatus::Success
                        } else {
                            PollStatus::Timeout
                        },
                    });
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..20_000 {
                        let snap = store.snapshot();
                        let Some(t) = snap.read_time else {
                            assert_eq!(snap, Snapshot::default());
                            continue;
                        };
                        let i = t.timestamp();
                        assert_eq!(snap.humidity, i as f32);
                        assert_eq!(snap.temperature, i as f32);
                        let expected = if i % 2 == 0 {
                            PollStatus::Success
                        } else {
                            PollStatus::Timeout
                        };
                        assert_eq!(snap.status, expected);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
