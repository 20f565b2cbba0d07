//! Definite-time trip timer.
//!
//! ```text
//!   NORMAL ──pickup──▶ PICKED_UP ──pickup, elapsed ≥ delay──▶ TRIPPED
//!     ▲                    │                                     │
//!     └────no pickup───────┘                                 reset()
//! ```
//!
//! Elapsed pickup time is accumulated from snapshot timestamps (or explicit
//! deltas), never waited out. Any snapshot without pickup clears it, so a
//! self-clearing unbalance leaves no credit toward a later one.

use bcf_core::DeviceId;
use bcf_detector::PickupVerdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// TripState
// ============================================================================

/// Trip timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripState {
    #[default]
    Normal,
    PickedUp,
    Tripped,
}

impl TripState {
    /// Numeric code used for gauges (0 = normal, 1 = picked up, 2 = tripped).
    pub fn code(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::PickedUp => 1,
            Self::Tripped => 2,
        }
    }
}

impl fmt::Display for TripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::PickedUp => write!(f, "PICKED_UP"),
            Self::Tripped => write!(f, "TRIPPED"),
        }
    }
}

// ============================================================================
// TripEvent
// ============================================================================

/// Emitted exactly once per entry into TRIPPED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripEvent {
    /// Unique event id.
    pub event_id: Uuid,
    /// Device whose breaker is commanded open.
    pub device: DeviceId,
    /// Timestamp of the snapshot that completed the delay.
    pub tripped_at: DateTime<Utc>,
    /// Continuous pickup time when the trip issued (s).
    pub elapsed_seconds: f64,
    /// I2/I1 on the tripping snapshot.
    pub ratio: f64,
    /// I1 on the tripping snapshot (A).
    pub i1: f64,
    /// I2 on the tripping snapshot (A).
    pub i2: f64,
}

// ============================================================================
// Transition
// ============================================================================

/// Outcome of feeding one verdict to the timer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: TripState,
    pub to: TripState,
    /// Present only on the cycle that entered TRIPPED.
    pub trip: Option<TripEvent>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

// ============================================================================
// TripTimer
// ============================================================================

/// Per-device trip state machine.
///
/// Owned by exactly one relay; not shared between devices.
#[derive(Debug, Clone)]
pub struct TripTimer {
    device: DeviceId,
    trip_delay: Duration,
    state: TripState,
    /// Continuous pickup time accumulated in PICKED_UP.
    elapsed: Duration,
    /// Timestamp of the last snapshot fed to `update`.
    last_evaluated_at: Option<DateTime<Utc>>,
    /// Set after a measurement gap; the next snapshot re-anchors timing.
    gap_pending: bool,
}

impl TripTimer {
    /// Create a timer in NORMAL.
    pub fn new(device: DeviceId, trip_delay: Duration) -> Self {
        Self {
            device,
            trip_delay,
            state: TripState::Normal,
            elapsed: Duration::ZERO,
            last_evaluated_at: None,
            gap_pending: false,
        }
    }

    pub fn state(&self) -> TripState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn trip_delay(&self) -> Duration {
        self.trip_delay
    }

    pub fn last_evaluated_at(&self) -> Option<DateTime<Utc>> {
        self.last_evaluated_at
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Feed a verdict measured at `at`. Δt is the time since the previous
    /// snapshot; it is zero for the first snapshot, after a gap, or when
    /// timestamps go backwards.
    pub fn update(&mut self, verdict: &PickupVerdict, at: DateTime<Utc>) -> Transition {
        let dt = match self.last_evaluated_at {
            Some(_) if self.gap_pending => Duration::ZERO,
            Some(last) => match (at - last).to_std() {
                Ok(dt) => dt,
                Err(_) => {
                    warn!(
                        device = %self.device,
                        %at,
                        %last,
                        "Snapshot timestamp went backwards, treating delta as zero"
                    );
                    Duration::ZERO
                }
            },
            None => Duration::ZERO,
        };

        self.gap_pending = false;
        self.last_evaluated_at = Some(match self.last_evaluated_at {
            Some(last) if last > at => last,
            _ => at,
        });

        self.advance(verdict, dt, at)
    }

    /// Feed a verdict with an explicit Δt since the previous cycle.
    ///
    /// Pickup and the delay check happen in the same call. With a zero trip
    /// delay a first pickup goes NORMAL → TRIPPED in one `Transition`
    /// (`from: Normal`, `to: Tripped`); PICKED_UP is never reported. The `dt`
    /// of the pickup call itself is not credited.
    pub fn advance(&mut self, verdict: &PickupVerdict, dt: Duration, at: DateTime<Utc>) -> Transition {
        let from = self.state;

        match (self.state, verdict.picked_up) {
            (TripState::Tripped, _) => {}
            (TripState::Normal, false) => {}
            (TripState::Normal, true) => {
                self.state = TripState::PickedUp;
                self.elapsed = Duration::ZERO;
                info!(
                    device = %self.device,
                    ratio = verdict.ratio,
                    i1 = verdict.i1,
                    i2 = verdict.i2,
                    "46BC picked up, definite-time delay started"
                );
            }
            (TripState::PickedUp, true) => {
                self.elapsed += dt;
            }
            (TripState::PickedUp, false) => {
                info!(
                    device = %self.device,
                    elapsed_ms = self.elapsed.as_millis() as u64,
                    "46BC dropped out before delay elapsed"
                );
                self.state = TripState::Normal;
                self.elapsed = Duration::ZERO;
            }
        }

        let trip = if self.state == TripState::PickedUp && self.elapsed >= self.trip_delay {
            self.state = TripState::Tripped;
            Some(TripEvent {
                event_id: Uuid::new_v4(),
                device: self.device.clone(),
                tripped_at: at,
                elapsed_seconds: self.elapsed.as_secs_f64(),
                ratio: verdict.ratio,
                i1: verdict.i1,
                i2: verdict.i2,
            })
        } else {
            None
        };

        debug!(
            device = %self.device,
            %from,
            to = %self.state,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Trip timer updated"
        );

        Transition {
            from,
            to: self.state,
            trip,
        }
    }

    /// Record a skipped cycle (no valid snapshot).
    ///
    /// State and elapsed time are kept. The time spanning the gap is not
    /// credited: the next snapshot contributes a zero delta.
    pub fn note_gap(&mut self) {
        if !self.gap_pending {
            warn!(
                device = %self.device,
                state = %self.state,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "Measurement gap, trip timer held"
            );
        }
        self.gap_pending = true;
    }

    /// Operator reset (trip acknowledged / breaker reclosed).
    ///
    /// Returns to NORMAL with no accumulated time. The next snapshot starts
    /// a fresh timing window.
    pub fn reset(&mut self) {
        if self.state != TripState::Normal {
            info!(device = %self.device, previous = %self.state, "Trip timer reset");
        }
        self.state = TripState::Normal;
        self.elapsed = Duration::ZERO;
        self.last_evaluated_at = None;
        self.gap_pending = false;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn device() -> DeviceId {
        DeviceId::new("Line.L1").unwrap()
    }

    fn timer(delay_s: f64) -> TripTimer {
        TripTimer::new(device(), Duration::from_secs_f64(delay_s))
    }

    fn pickup() -> PickupVerdict {
        PickupVerdict {
            picked_up: true,
            blocked: false,
            ratio: 0.5,
            i1: 66.7,
            i2: 33.3,
        }
    }

    fn no_pickup() -> PickupVerdict {
        PickupVerdict {
            picked_up: false,
            blocked: false,
            ratio: 0.0,
            i1: 100.0,
            i2: 0.0,
        }
    }

    fn ms(n: i64) -> TimeDelta {
        TimeDelta::milliseconds(n)
    }

    #[test]
    fn test_initial_state() {
        let t = timer(1.0);
        assert_eq!(t.state(), TripState::Normal);
        assert_eq!(t.elapsed(), Duration::ZERO);
        assert!(t.last_evaluated_at().is_none());
    }

    #[test]
    fn test_normal_stays_normal() {
        let mut t = timer(1.0);
        let t0 = Utc::now();
        for i in 0..5 {
            let tr = t.update(&no_pickup(), t0 + ms(i * 100));
            assert!(!tr.changed());
            assert!(tr.trip.is_none());
        }
        assert_eq!(t.state(), TripState::Normal);
    }

    #[test]
    fn test_pickup_starts_with_zero_elapsed() {
        let mut t = timer(1.0);
        let t0 = Utc::now();
        t.update(&no_pickup(), t0);
        let tr = t.update(&pickup(), t0 + ms(500));

        assert_eq!(tr.from, TripState::Normal);
        assert_eq!(tr.to, TripState::PickedUp);
        assert_eq!(t.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_trips_after_continuous_delay() {
        let mut t = timer(1.0);
        let t0 = Utc::now();

        let mut trips = 0;
        for i in 0..=4 {
            let tr = t.update(&pickup(), t0 + ms(i * 250));
            trips += tr.trip.iter().count();
            if i < 4 {
                assert_eq!(t.state(), TripState::PickedUp, "cycle {i}");
            }
        }

        assert_eq!(t.state(), TripState::Tripped);
        assert_eq!(trips, 1);
        assert_eq!(t.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_trip_event_contents() {
        let mut t = timer(0.5);
        let t0 = Utc::now();
        t.update(&pickup(), t0);
        let tr = t.update(&pickup(), t0 + ms(500));

        let event = tr.trip.expect("trip event");
        assert_eq!(event.device, device());
        assert_eq!(event.tripped_at, t0 + ms(500));
        assert!((event.elapsed_seconds - 0.5).abs() < 1e-9);
        assert_eq!(event.ratio, 0.5);
        assert_eq!(tr.from, TripState::PickedUp);
        assert_eq!(tr.to, TripState::Tripped);
    }

    #[test]
    fn test_tripped_is_idempotent() {
        let mut t = timer(0.5);
        let t0 = Utc::now();
        t.update(&pickup(), t0);
        assert!(t.update(&pickup(), t0 + ms(600)).trip.is_some());

        for i in 1..10 {
            let tr = t.update(&pickup(), t0 + ms(600 + i * 100));
            assert!(tr.trip.is_none());
            assert_eq!(tr.to, TripState::Tripped);
        }
        // Dropout does not release a trip either
        let tr = t.update(&no_pickup(), t0 + ms(2000));
        assert_eq!(tr.to, TripState::Tripped);
        assert!(tr.trip.is_none());
    }

    #[test]
    fn test_interruption_resets_window() {
        let mut t = timer(1.0);
        let t0 = Utc::now();

        t.update(&pickup(), t0);
        t.update(&pickup(), t0 + ms(900));
        assert_eq!(t.elapsed(), Duration::from_millis(900));

        let tr = t.update(&no_pickup(), t0 + ms(950));
        assert_eq!(tr.to, TripState::Normal);
        assert_eq!(t.elapsed(), Duration::ZERO);

        // Fresh window: re-entry starts at zero, needs a full second again
        t.update(&pickup(), t0 + ms(1000));
        t.update(&pickup(), t0 + ms(1900));
        assert_eq!(t.state(), TripState::PickedUp);
        let tr = t.update(&pickup(), t0 + ms(2000));
        assert_eq!(tr.to, TripState::Tripped);
        assert!(tr.trip.is_some());
    }

    #[test]
    fn test_zero_delay_trips_on_first_pickup() {
        let mut t = timer(0.0);
        let tr = t.update(&pickup(), Utc::now());
        assert_eq!(tr.from, TripState::Normal);
        assert_eq!(tr.to, TripState::Tripped);
        assert!(tr.trip.is_some());
    }

    #[test]
    fn test_zero_delay_advance_skips_picked_up() {
        let mut t = timer(0.0);
        let at = Utc::now();

        let tr = t.advance(&pickup(), Duration::from_secs(5), at);
        assert_eq!((tr.from, tr.to), (TripState::Normal, TripState::Tripped));
        assert_eq!(tr.trip.unwrap().elapsed_seconds, 0.0);

        let tr = t.advance(&pickup(), Duration::from_millis(100), at + ms(100));
        assert_eq!((tr.from, tr.to), (TripState::Tripped, TripState::Tripped));
        assert!(tr.trip.is_none());
    }

    #[test]
    fn test_gap_holds_state_without_crediting_time() {
        let mut t = timer(1.0);
        let t0 = Utc::now();

        t.update(&pickup(), t0);
        t.update(&pickup(), t0 + ms(500));
        t.note_gap();
        t.note_gap();

        assert_eq!(t.state(), TripState::PickedUp);
        assert_eq!(t.elapsed(), Duration::from_millis(500));

        // Next valid snapshot 5 s later: gap time not credited
        t.update(&pickup(), t0 + ms(5500));
        assert_eq!(t.state(), TripState::PickedUp);
        assert_eq!(t.elapsed(), Duration::from_millis(500));

        // Timing continues from there
        let tr = t.update(&pickup(), t0 + ms(6000));
        assert_eq!(tr.to, TripState::Tripped);
    }

    #[test]
    fn test_backwards_timestamp_adds_nothing() {
        let mut t = timer(1.0);
        let t0 = Utc::now();

        t.update(&pickup(), t0 + ms(500));
        t.update(&pickup(), t0);
        assert_eq!(t.elapsed(), Duration::ZERO);
        assert_eq!(t.last_evaluated_at(), Some(t0 + ms(500)));
    }

    #[test]
    fn test_advance_with_explicit_delta() {
        let mut t = timer(1.0);
        let at = Utc::now();

        t.advance(&pickup(), Duration::ZERO, at);
        for _ in 0..3 {
            assert!(t.advance(&pickup(), Duration::from_millis(300), at).trip.is_none());
        }
        assert!(t.advance(&pickup(), Duration::from_millis(100), at).trip.is_some());
    }

    #[test]
    fn test_reset_after_trip() {
        let mut t = timer(0.25);
        let t0 = Utc::now();
        t.update(&pickup(), t0);
        t.update(&pickup(), t0 + ms(250));
        assert_eq!(t.state(), TripState::Tripped);

        t.reset();
        assert_eq!(t.state(), TripState::Normal);
        assert_eq!(t.elapsed(), Duration::ZERO);
        assert!(t.last_evaluated_at().is_none());

        // A persisting fault trips again after a full new window
        t.update(&pickup(), t0 + ms(300));
        assert_eq!(t.state(), TripState::PickedUp);
        assert!(t.update(&pickup(), t0 + ms(550)).trip.is_some());
    }

    #[test]
    fn test_trip_state_display_and_serde() {
        assert_eq!(TripState::PickedUp.to_string(), "PICKED_UP");
        assert_eq!(
            serde_json::to_string(&TripState::Tripped).unwrap(),
            "\"TRIPPED\""
        );
        assert_eq!(TripState::Normal.code(), 0);
        assert_eq!(TripState::Tripped.code(), 2);
    }
}
