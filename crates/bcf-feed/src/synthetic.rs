//! Synthetic feeder model.
//!
//! Stands in for the external circuit solver: each device carries a
//! balanced three-phase load, and individual phases can be opened to model
//! a broken conductor. Opening a phase removes that phase's current; the
//! healthy phases keep their load current.
//!
//! The model can run on wall-clock time or on a manually advanced clock,
//! which lets the relay's definite-time delay be exercised without waiting.

use crate::error::{FeedError, FeedResult};
use crate::source::MeasurementSource;
use bcf_core::{DeviceId, Phase, PhaseCurrents};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Load carried by one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeederLoad {
    /// Per-phase RMS load current (A).
    pub load_amps: f64,
    /// Phase-A current angle (degrees). Lagging loads are negative.
    #[serde(default)]
    pub angle_deg: f64,
}

impl FeederLoad {
    pub fn new(load_amps: f64, angle_deg: f64) -> Self {
        Self {
            load_amps,
            angle_deg,
        }
    }
}

#[derive(Debug, Clone)]
struct DeviceModel {
    load: FeederLoad,
    open: [bool; 3],
}

impl DeviceModel {
    fn currents(&self, at: DateTime<Utc>) -> PhaseCurrents {
        let mut currents = PhaseCurrents::balanced(self.load.load_amps, self.load.angle_deg, at);
        for (phase, open) in Phase::ALL.iter().zip(self.open) {
            if open {
                currents = currents.with_open_phase(*phase);
            }
        }
        currents
    }
}

fn phase_index(phase: Phase) -> usize {
    match phase {
        Phase::A => 0,
        Phase::B => 1,
        Phase::C => 2,
    }
}

/// Feeder model with switchable conductors.
#[derive(Debug, Default)]
pub struct SyntheticFeeder {
    devices: RwLock<HashMap<DeviceId, DeviceModel>>,
    /// Manual clock; `None` means wall-clock time.
    clock: RwLock<Option<DateTime<Utc>>>,
}

impl SyntheticFeeder {
    /// Feeder on wall-clock time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeder on a manual clock starting at `start`.
    pub fn with_manual_clock(start: DateTime<Utc>) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            clock: RwLock::new(Some(start)),
        }
    }

    /// Add or replace a device with all phases closed.
    pub fn add_device(&self, device: DeviceId, load: FeederLoad) {
        self.devices.write().insert(
            device,
            DeviceModel {
                load,
                open: [false; 3],
            },
        );
    }

    /// Open one conductor (broken-conductor fault).
    pub fn open_phase(&self, device: &DeviceId, phase: Phase) -> FeedResult<()> {
        self.set_phase_open(device, phase, true)?;
        info!(%device, %phase, "Conductor opened");
        Ok(())
    }

    /// Restore one conductor.
    pub fn close_phase(&self, device: &DeviceId, phase: Phase) -> FeedResult<()> {
        self.set_phase_open(device, phase, false)?;
        info!(%device, %phase, "Conductor restored");
        Ok(())
    }

    fn set_phase_open(&self, device: &DeviceId, phase: Phase, open: bool) -> FeedResult<()> {
        let mut devices = self.devices.write();
        let model = devices
            .get_mut(device)
            .ok_or_else(|| FeedError::DeviceNotFound(device.to_string()))?;
        model.open[phase_index(phase)] = open;
        Ok(())
    }

    /// Phases currently open on a device.
    pub fn open_phases(&self, device: &DeviceId) -> Vec<Phase> {
        self.devices
            .read()
            .get(device)
            .map(|model| {
                Phase::ALL
                    .into_iter()
                    .filter(|p| model.open[phase_index(*p)])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Advance the manual clock. No-op on wall-clock time.
    pub fn advance(&self, by: Duration) {
        if let Some(now) = self.clock.write().as_mut() {
            *now += by;
        }
    }

    /// Current model time.
    pub fn now(&self) -> DateTime<Utc> {
        let clock = *self.clock.read();
        clock.unwrap_or_else(Utc::now)
    }

    pub fn devices(&self) -> Vec<DeviceId> {
        self.devices.read().keys().cloned().collect()
    }
}

impl MeasurementSource for SyntheticFeeder {
    fn snapshot(&self, device: &DeviceId) -> FeedResult<PhaseCurrents> {
        let at = self.now();
        self.devices
            .read()
            .get(device)
            .map(|model| model.currents(at))
            .ok_or_else(|| FeedError::DeviceNotFound(device.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> DeviceId {
        DeviceId::new("Line.L1").unwrap()
    }

    #[test]
    fn test_healthy_feeder_is_balanced() {
        let feeder = SyntheticFeeder::new();
        feeder.add_device(line(), FeederLoad::new(100.0, -25.0));

        let seq = feeder.snapshot(&line()).unwrap().sequence();
        assert!((seq.i1 - 100.0).abs() < 1e-9);
        assert!(seq.i2 < 1e-9);
    }

    #[test]
    fn test_open_and_close_phase() {
        let feeder = SyntheticFeeder::new();
        feeder.add_device(line(), FeederLoad::new(100.0, 0.0));

        feeder.open_phase(&line(), Phase::A).unwrap();
        assert_eq!(feeder.open_phases(&line()), vec![Phase::A]);
        let snap = feeder.snapshot(&line()).unwrap();
        assert_eq!(snap.ia.norm(), 0.0);
        let seq = snap.sequence();
        assert!(seq.i2 / seq.i1 > 0.15);

        feeder.close_phase(&line(), Phase::A).unwrap();
        assert!(feeder.open_phases(&line()).is_empty());
        assert!(feeder.snapshot(&line()).unwrap().sequence().i2 < 1e-9);
    }

    #[test]
    fn test_unknown_device() {
        let feeder = SyntheticFeeder::new();
        assert!(matches!(
            feeder.snapshot(&line()),
            Err(FeedError::DeviceNotFound(_))
        ));
        assert!(feeder.open_phase(&line(), Phase::B).is_err());
    }

    #[test]
    fn test_manual_clock_advances_snapshot_time() {
        let start = Utc::now();
        let feeder = SyntheticFeeder::with_manual_clock(start);
        feeder.add_device(line(), FeederLoad::new(50.0, 0.0));

        assert_eq!(feeder.snapshot(&line()).unwrap().measured_at, start);
        feeder.advance(Duration::milliseconds(250));
        assert_eq!(
            feeder.snapshot(&line()).unwrap().measured_at,
            start + Duration::milliseconds(250)
        );
    }
}
