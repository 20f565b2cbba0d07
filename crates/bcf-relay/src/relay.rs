//! Per-device 46BC relay.
//!
//! One evaluation cycle:
//! snapshot → sequence components → pickup verdict → trip timer → record.
//!
//! Each monitored device gets its own `ProtectionRelay`; relays share no
//! mutable state.

use bcf_core::{DeviceId, PhaseCurrents, SequenceCurrents};
use bcf_detector::{evaluate_pickup, DetectorResult, PickupVerdict, ProtectionConfig};
use bcf_feed::{FeedResult, MeasurementSource};
use bcf_telemetry::Metrics;
use bcf_trip::{TripEvent, TripState, TripTimer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Structured result of one evaluation, for any reporting sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub device: DeviceId,
    pub measured_at: DateTime<Utc>,
    /// Zero-sequence magnitude (A).
    pub i0: f64,
    /// Positive-sequence magnitude (A).
    pub i1: f64,
    /// Negative-sequence magnitude (A).
    pub i2: f64,
    /// I2/I1 (0 when I1 is 0).
    pub ratio: f64,
    pub picked_up: bool,
    /// Minimum-load security block active.
    pub blocked: bool,
    /// Trip timer state after this evaluation.
    pub state: TripState,
    /// Continuous pickup time accumulated so far (s).
    pub elapsed_seconds: f64,
    /// Present only on the evaluation that entered TRIPPED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripEvent>,
}

/// 46BC relay for one monitored device.
#[derive(Debug, Clone)]
pub struct ProtectionRelay {
    device: DeviceId,
    config: ProtectionConfig,
    timer: TripTimer,
}

impl ProtectionRelay {
    /// Build a relay. Invalid settings are rejected here and never reach
    /// evaluation.
    pub fn new(device: DeviceId, config: ProtectionConfig) -> DetectorResult<Self> {
        config.validate()?;
        let timer = TripTimer::new(device.clone(), config.trip_delay()?);
        Ok(Self {
            device,
            config,
            timer,
        })
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn config(&self) -> &ProtectionConfig {
        &self.config
    }

    pub fn state(&self) -> TripState {
        self.timer.state()
    }

    pub fn timer(&self) -> &TripTimer {
        &self.timer
    }

    /// Pull a snapshot from `source` and evaluate it.
    ///
    /// A measurement error skips the cycle: it is returned to the caller,
    /// the trip timer keeps its state, and the gap is not counted as pickup
    /// time.
    pub fn run_cycle<S>(&mut self, source: &S) -> FeedResult<EvaluationRecord>
    where
        S: MeasurementSource + ?Sized,
    {
        match source.snapshot(&self.device) {
            Ok(currents) => Ok(self.evaluate(&currents)),
            Err(e) => {
                warn!(device = %self.device, error = %e, "Measurement unavailable, cycle skipped");
                Metrics::measurement_error(self.device.as_str(), e.kind());
                self.timer.note_gap();
                Err(e)
            }
        }
    }

    /// Evaluate one snapshot.
    pub fn evaluate(&mut self, currents: &PhaseCurrents) -> EvaluationRecord {
        let seq = currents.sequence();
        let verdict = evaluate_pickup(seq.i1, seq.i2, &self.config);
        self.apply(&seq, &verdict, currents.measured_at)
    }

    fn apply(
        &mut self,
        seq: &SequenceCurrents,
        verdict: &PickupVerdict,
        measured_at: DateTime<Utc>,
    ) -> EvaluationRecord {
        let elapsed_before = self.timer.elapsed();
        let transition = self.timer.update(verdict, measured_at);

        let device = self.device.as_str();
        Metrics::evaluation(device, verdict.i1, verdict.i2, verdict.ratio);
        Metrics::trip_state(
            device,
            transition.to.code(),
            self.timer.elapsed().as_secs_f64(),
        );
        if transition.from == TripState::PickedUp && transition.to == TripState::Normal {
            Metrics::dropout(device, elapsed_before.as_secs_f64());
        }
        if transition.trip.is_some() {
            Metrics::trip_issued(device);
        }

        debug!(
            device,
            i1 = format_args!("{:.2}", verdict.i1),
            i2 = format_args!("{:.2}", verdict.i2),
            min_load = format_args!("{:.2}", self.config.min_load_amps()),
            ratio = format_args!("{:.4}", verdict.ratio),
            threshold = self.config.ratio_threshold,
            picked_up = verdict.picked_up,
            blocked = verdict.blocked,
            state = %transition.to,
            "46BC evaluated"
        );

        EvaluationRecord {
            device: self.device.clone(),
            measured_at,
            i0: seq.i0,
            i1: verdict.i1,
            i2: verdict.i2,
            ratio: verdict.ratio,
            picked_up: verdict.picked_up,
            blocked: verdict.blocked,
            state: transition.to,
            elapsed_seconds: self.timer.elapsed().as_secs_f64(),
            trip: transition.trip,
        }
    }

    /// Operator acknowledge after a trip; returns the relay to NORMAL.
    pub fn acknowledge_trip(&mut self) {
        self.timer.reset();
        Metrics::trip_state(self.device.as_str(), TripState::Normal.code(), 0.0);
    }
}
