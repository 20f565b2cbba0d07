//! Latest-reading store fed by an external circuit solver.
//!
//! The solver pushes raw terminal current vectors in its native layout
//! (`[Ia.re, Ia.im, Ib.re, Ib.im, Ic.re, Ic.im, ...]`). Readings are kept
//! as received and validated when the relay asks for a snapshot, so a
//! malformed push surfaces as an error on that device's next cycle.

use crate::error::{FeedError, FeedResult};
use crate::source::MeasurementSource;
use bcf_core::{DeviceId, PhaseCurrents};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, trace};

/// Raw reading as pushed by the solver.
#[derive(Debug, Clone)]
struct TerminalReading {
    values: Vec<f64>,
    measured_at: DateTime<Utc>,
}

/// Thread-safe store of the latest reading per device.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    readings: DashMap<DeviceId, TerminalReading>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            readings: DashMap::new(),
        }
    }

    /// Record a raw terminal current vector for a device.
    pub fn push_terminal_values(
        &self,
        device: DeviceId,
        values: Vec<f64>,
        measured_at: DateTime<Utc>,
    ) {
        trace!(%device, len = values.len(), "Terminal reading received");
        self.readings.insert(
            device,
            TerminalReading {
                values,
                measured_at,
            },
        );
    }

    /// Record an already-assembled phasor snapshot for a device.
    pub fn push_currents(&self, device: DeviceId, currents: PhaseCurrents) {
        let values = vec![
            currents.ia.re,
            currents.ia.im,
            currents.ib.re,
            currents.ib.im,
            currents.ic.re,
            currents.ic.im,
        ];
        self.push_terminal_values(device, values, currents.measured_at);
    }

    /// Forget a device. Subsequent snapshots report it as not found.
    pub fn remove(&self, device: &DeviceId) -> bool {
        let removed = self.readings.remove(device).is_some();
        if removed {
            debug!(%device, "Device removed from snapshot store");
        }
        removed
    }

    pub fn contains(&self, device: &DeviceId) -> bool {
        self.readings.contains_key(device)
    }

    /// All devices with a stored reading.
    pub fn devices(&self) -> Vec<DeviceId> {
        self.readings.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl MeasurementSource for SnapshotStore {
    fn snapshot(&self, device: &DeviceId) -> FeedResult<PhaseCurrents> {
        let reading = self
            .readings
            .get(device)
            .ok_or_else(|| FeedError::DeviceNotFound(device.to_string()))?;

        PhaseCurrents::from_terminal_values(&reading.values, reading.measured_at)
            .map_err(|e| FeedError::from_core(device.as_str(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceId {
        DeviceId::new("Line.L1").unwrap()
    }

    #[test]
    fn test_missing_device() {
        let store = SnapshotStore::new();
        let err = store.snapshot(&device()).unwrap_err();
        assert!(matches!(err, FeedError::DeviceNotFound(_)));
    }

    #[test]
    fn test_short_vector_is_insufficient_data() {
        let store = SnapshotStore::new();
        store.push_terminal_values(device(), vec![1.0, 0.0, 1.0, 0.0, 1.0], Utc::now());

        match store.snapshot(&device()).unwrap_err() {
            FeedError::InsufficientData {
                device,
                expected,
                actual,
            } => {
                assert_eq!(device, "Line.L1");
                assert_eq!(expected, 6);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_finite_is_invalid_data() {
        let store = SnapshotStore::new();
        store.push_terminal_values(
            device(),
            vec![1.0, 0.0, f64::INFINITY, 0.0, 1.0, 0.0],
            Utc::now(),
        );
        assert!(matches!(
            store.snapshot(&device()).unwrap_err(),
            FeedError::InvalidData { .. }
        ));
    }

    #[test]
    fn test_push_currents_round_trip() {
        let store = SnapshotStore::new();
        let at = Utc::now();
        let currents = PhaseCurrents::balanced(100.0, -30.0, at);
        store.push_currents(device(), currents);

        let snap = store.snapshot(&device()).unwrap();
        assert_eq!(snap, currents);
        assert_eq!(store.devices(), vec![device()]);
    }

    #[test]
    fn test_remove() {
        let store = SnapshotStore::new();
        store.push_currents(device(), PhaseCurrents::balanced(10.0, 0.0, Utc::now()));
        assert!(store.contains(&device()));
        assert!(store.remove(&device()));
        assert!(!store.remove(&device()));
        assert!(store.snapshot(&device()).is_err());
    }
}
