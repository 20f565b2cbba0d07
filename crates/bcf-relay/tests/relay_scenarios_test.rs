//! End-to-end relay scenarios.
//!
//! Drives `ProtectionRelay` from raw solver-style terminal vectors pushed
//! into a `SnapshotStore`, the way an external circuit solver would.

use bcf_core::DeviceId;
use bcf_detector::ProtectionConfig;
use bcf_feed::{FeedError, SnapshotStore};
use bcf_relay::ProtectionRelay;
use bcf_trip::TripState;
use chrono::{DateTime, TimeDelta, Utc};

const STEP_MS: i64 = 100;

fn line() -> DeviceId {
    DeviceId::new("Line.L1").unwrap()
}

/// `[Ia.re, Ia.im, Ib.re, Ib.im, Ic.re, Ic.im]` for the given magnitudes at
/// 0°, -120° and +120°.
fn terminal(ia: f64, ib: f64, ic: f64) -> Vec<f64> {
    let (s, c) = (120f64.to_radians().sin(), 120f64.to_radians().cos());
    vec![ia, 0.0, ib * c, -ib * s, ic * c, ic * s]
}

/// Push `values` every step for `cycles` cycles and evaluate after each push.
fn drive(
    relay: &mut ProtectionRelay,
    store: &SnapshotStore,
    values: &[f64],
    t0: DateTime<Utc>,
    cycles: i64,
) -> Vec<bcf_relay::EvaluationRecord> {
    (0..cycles)
        .map(|i| {
            store.push_terminal_values(
                line(),
                values.to_vec(),
                t0 + TimeDelta::milliseconds(i * STEP_MS),
            );
            relay.run_cycle(store).unwrap()
        })
        .collect()
}

#[test]
fn test_balanced_load_stays_normal() {
    let store = SnapshotStore::new();
    let mut relay = ProtectionRelay::new(line(), ProtectionConfig::default()).unwrap();

    let records = drive(&mut relay, &store, &terminal(100.0, 100.0, 100.0), Utc::now(), 20);

    for record in &records {
        assert!((record.i1 - 100.0).abs() < 1e-6);
        assert!(record.i2 < 1e-6);
        assert!(record.ratio < 1e-6);
        assert!(!record.picked_up);
        assert_eq!(record.state, TripState::Normal);
    }
}

#[test]
fn test_open_phase_a_trips_after_one_second() {
    let store = SnapshotStore::new();
    let mut relay = ProtectionRelay::new(line(), ProtectionConfig::default()).unwrap();

    let records = drive(&mut relay, &store, &terminal(0.0, 100.0, 100.0), Utc::now(), 15);

    assert!(records[0].ratio > 0.15);
    assert!(records[0].i1 > ProtectionConfig::default().min_load_amps());
    assert!(records[..10].iter().all(|r| r.state == TripState::PickedUp));

    // 1.0 s of continuous pickup is reached on the 11th snapshot
    assert_eq!(records[10].state, TripState::Tripped);
    let trip = records[10].trip.as_ref().unwrap();
    assert_eq!(trip.device, line());
    assert!((trip.elapsed_seconds - 1.0).abs() < 1e-9);

    // Exactly one trip event per entry into TRIPPED
    assert_eq!(records.iter().filter(|r| r.trip.is_some()).count(), 1);
    assert!(records[11..].iter().all(|r| r.state == TripState::Tripped));
}

#[test]
fn test_light_load_open_phase_blocked() {
    let store = SnapshotStore::new();
    let mut relay = ProtectionRelay::new(line(), ProtectionConfig::default()).unwrap();

    let records = drive(&mut relay, &store, &terminal(0.0, 5.0, 5.0), Utc::now(), 20);

    for record in &records {
        assert!(record.ratio > 0.15);
        assert!(record.blocked);
        assert!(!record.picked_up);
        assert_eq!(record.state, TripState::Normal);
    }
}

#[test]
fn test_interrupted_pickup_restarts_window() {
    let store = SnapshotStore::new();
    let mut relay = ProtectionRelay::new(line(), ProtectionConfig::default()).unwrap();
    let t0 = Utc::now();

    let open = terminal(0.0, 100.0, 100.0);
    let healthy = terminal(100.0, 100.0, 100.0);

    drive(&mut relay, &store, &open, t0, 8);
    assert_eq!(relay.state(), TripState::PickedUp);

    // One healthy snapshot clears the pickup
    store.push_terminal_values(line(), healthy, t0 + TimeDelta::milliseconds(800));
    assert_eq!(relay.run_cycle(&store).unwrap().state, TripState::Normal);

    // A new window needs the full delay again
    let restart = t0 + TimeDelta::milliseconds(900);
    let records = drive(&mut relay, &store, &open, restart, 11);
    assert!(records[..10].iter().all(|r| r.state == TripState::PickedUp));
    assert_eq!(records[10].state, TripState::Tripped);
}

#[test]
fn test_short_solver_vector_skips_cycle() {
    let store = SnapshotStore::new();
    let mut relay = ProtectionRelay::new(line(), ProtectionConfig::default()).unwrap();
    let t0 = Utc::now();

    drive(&mut relay, &store, &terminal(0.0, 100.0, 100.0), t0, 5);
    assert_eq!(relay.state(), TripState::PickedUp);

    store.push_terminal_values(line(), vec![0.0, 0.0, 1.0], t0 + TimeDelta::milliseconds(500));
    let err = relay.run_cycle(&store).unwrap_err();
    assert!(matches!(err, FeedError::InsufficientData { actual: 3, .. }));
    assert_eq!(relay.state(), TripState::PickedUp);
}

#[test]
fn test_unknown_device_is_error() {
    let store = SnapshotStore::new();
    let mut relay = ProtectionRelay::new(line(), ProtectionConfig::default()).unwrap();

    let err = relay.run_cycle(&store).unwrap_err();
    assert!(matches!(err, FeedError::DeviceNotFound(_)));
}
