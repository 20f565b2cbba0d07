//! Demo scenarios on the synthetic feeder.
//!
//! Each case gets a fresh relay and a feeder on a manual clock, so the
//! definite-time delay is exercised in simulated time.

use crate::error::{AppError, AppResult};
use crate::relay::{EvaluationRecord, ProtectionRelay};
use bcf_core::{DeviceId, Phase};
use bcf_detector::ProtectionConfig;
use bcf_feed::{FeederLoad, MeasurementSource, SyntheticFeeder};
use bcf_trip::TripState;
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Device monitored by the demo feeder.
pub const DEMO_DEVICE: &str = "Line.L1";

/// Simulated time between demo evaluations (ms).
pub const DEMO_STEP_MS: i64 = 100;

/// Load below the minimum-load block with the default settings (A).
pub const LIGHT_LOAD_AMPS: f64 = 5.0;

/// One demo case.
#[derive(Debug, Clone)]
pub struct DemoCase {
    pub title: String,
    pub load: FeederLoad,
    pub open_phases: Vec<Phase>,
}

impl DemoCase {
    pub fn new(title: impl Into<String>, load: FeederLoad, open_phases: Vec<Phase>) -> Self {
        Self {
            title: title.into(),
            load,
            open_phases,
        }
    }
}

/// Result of driving one case through the relay.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub title: String,
    pub open_phases: Vec<Phase>,
    /// Evaluations performed.
    pub cycles: u32,
    /// Last evaluation record.
    pub last: EvaluationRecord,
    pub min_load_amps: f64,
    pub ratio_threshold: f64,
    pub trip_delay_seconds: f64,
}

impl CaseOutcome {
    pub fn status(&self) -> TripState {
        self.last.state
    }

    pub fn is_tripped(&self) -> bool {
        self.last.state == TripState::Tripped
    }
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ---", self.title)?;
        for phase in &self.open_phases {
            writeln!(f, "Fault simulated: phase {phase} of {} is open.", self.last.device)?;
        }
        writeln!(
            f,
            "  > I1 magnitude (positive sequence): {:.2} A (min req: {:.2} A)",
            self.last.i1, self.min_load_amps
        )?;
        writeln!(f, "  > I2 magnitude (negative sequence): {:.2} A", self.last.i2)?;
        if self.last.blocked {
            writeln!(f, "  I1 is below minimum load threshold. Trip prevented.")?;
        } else {
            writeln!(
                f,
                "  > Ratio I2/I1: {:.4} (threshold: {:.2})",
                self.last.ratio, self.ratio_threshold
            )?;
            if self.last.picked_up {
                writeln!(
                    f,
                    "  Broken conductor confirmed by ratio check; definite time delay {} s.",
                    self.trip_delay_seconds
                )?;
            } else {
                writeln!(f, "  I2/I1 ratio is normal.")?;
            }
        }
        if let Some(trip) = &self.last.trip {
            writeln!(
                f,
                "  *** TRIP COMMAND ISSUED to breaker/recloser controlling {} after {:.2} s ***",
                trip.device, trip.elapsed_seconds
            )?;
        }
        write!(
            f,
            "-> Status: {} ({} evaluations)",
            if self.is_tripped() { "TRIPPED" } else { "NORMAL" },
            self.cycles
        )
    }
}

/// Standard demo cases for a feeder carrying `load_amps`.
pub fn demo_cases(load_amps: f64) -> Vec<DemoCase> {
    vec![
        DemoCase::new(
            "CASE 1: HEALTHY OPERATION",
            FeederLoad::new(load_amps, 0.0),
            Vec::new(),
        ),
        DemoCase::new(
            "CASE 2: SIMULATE BCF (Phase A Open)",
            FeederLoad::new(load_amps, 0.0),
            vec![Phase::A],
        ),
        DemoCase::new(
            "CASE 3: LIGHT LOAD BCF (Phase A Open)",
            FeederLoad::new(LIGHT_LOAD_AMPS, 0.0),
            vec![Phase::A],
        ),
    ]
}

fn demo_device() -> AppResult<DeviceId> {
    Ok(DeviceId::new(DEMO_DEVICE)?)
}

/// Drive one case until the relay trips or the trip delay plus two steps
/// has passed in simulated time.
pub fn run_case(case: &DemoCase, config: &ProtectionConfig) -> AppResult<CaseOutcome> {
    let device = demo_device()?;
    let mut relay = ProtectionRelay::new(device.clone(), *config)?;

    let feeder = SyntheticFeeder::with_manual_clock(Utc::now());
    feeder.add_device(device.clone(), case.load);
    for phase in &case.open_phases {
        feeder.open_phase(&device, *phase)?;
    }

    let delay_ms = i64::try_from(relay.timer().trip_delay().as_millis()).unwrap_or(i64::MAX);
    let max_cycles = u32::try_from(delay_ms / DEMO_STEP_MS + 2).unwrap_or(u32::MAX);

    let mut cycles = 0;
    let mut last = None;
    while cycles <= max_cycles {
        let record = relay.run_cycle(&feeder)?;
        cycles += 1;
        let tripped = record.state == TripState::Tripped;
        last = Some(record);
        if tripped {
            break;
        }
        feeder.advance(TimeDelta::milliseconds(DEMO_STEP_MS));
    }

    let last = last.ok_or_else(|| AppError::Config("demo ran no evaluations".to_string()))?;
    info!(case = %case.title, state = %last.state, cycles, "Demo case finished");

    Ok(CaseOutcome {
        title: case.title.clone(),
        open_phases: case.open_phases.clone(),
        cycles,
        last,
        min_load_amps: config.min_load_amps(),
        ratio_threshold: config.ratio_threshold,
        trip_delay_seconds: config.trip_delay_seconds,
    })
}

/// Run every demo case with the same settings.
pub fn run_demo(load_amps: f64, config: &ProtectionConfig) -> AppResult<Vec<CaseOutcome>> {
    demo_cases(load_amps)
        .iter()
        .map(|case| run_case(case, config))
        .collect()
}

/// Sequence magnitudes of one operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencePair {
    #[serde(rename = "I1")]
    pub i1: f64,
    #[serde(rename = "I2")]
    pub i2: f64,
}

/// Healthy vs. phase-A-open comparison, for charting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub healthy: SequencePair,
    pub faulted: SequencePair,
}

fn measure<S: MeasurementSource + ?Sized>(source: &S, device: &DeviceId) -> AppResult<SequencePair> {
    let seq = source.snapshot(device)?.sequence();
    Ok(SequencePair {
        i1: seq.i1,
        i2: seq.i2,
    })
}

/// Measure the feeder healthy, open phase A, measure again.
pub fn comparison_report(load: FeederLoad) -> AppResult<ComparisonReport> {
    let device = demo_device()?;
    let feeder = SyntheticFeeder::new();
    feeder.add_device(device.clone(), load);

    let healthy = measure(&feeder, &device)?;
    feeder.open_phase(&device, Phase::A)?;
    let faulted = measure(&feeder, &device)?;

    Ok(ComparisonReport { healthy, faulted })
}
