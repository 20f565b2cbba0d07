//! Pickup evaluation.
//!
//! Two checks, in order:
//! 1. Security block: `I1 < rated_current * min_load_fraction` never picks up.
//! 2. Ratio: `I2 / I1 > ratio_threshold` picks up (`ratio = 0` when `I1 = 0`).

use crate::config::ProtectionConfig;
use bcf_core::SequenceCurrents;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Result of evaluating one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupVerdict {
    /// Whether the element picked up on this snapshot.
    pub picked_up: bool,
    /// Whether the minimum-load security block suppressed pickup.
    pub blocked: bool,
    /// I2/I1, or 0 when I1 is 0.
    pub ratio: f64,
    /// Positive-sequence magnitude (A).
    pub i1: f64,
    /// Negative-sequence magnitude (A).
    pub i2: f64,
}

impl PickupVerdict {
    /// Evaluate precomputed sequence currents.
    pub fn from_sequence(seq: &SequenceCurrents, config: &ProtectionConfig) -> Self {
        evaluate_pickup(seq.i1, seq.i2, config)
    }
}

/// Evaluate pickup for one snapshot's sequence magnitudes.
///
/// `i1` and `i2` are expected to be non-negative magnitudes.
pub fn evaluate_pickup(i1: f64, i2: f64, config: &ProtectionConfig) -> PickupVerdict {
    let ratio = if i1 > 0.0 { i2 / i1 } else { 0.0 };

    if i1 < config.min_load_amps() {
        trace!(i1, min_load_amps = config.min_load_amps(), "Security block: load too light");
        return PickupVerdict {
            picked_up: false,
            blocked: true,
            ratio,
            i1,
            i2,
        };
    }

    PickupVerdict {
        picked_up: ratio > config.ratio_threshold,
        blocked: false,
        ratio,
        i1,
        i2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcf_core::{Phase, PhaseCurrents};
    use chrono::Utc;

    fn config() -> ProtectionConfig {
        ProtectionConfig::default()
    }

    #[test]
    fn test_balanced_load_no_pickup() {
        let seq = PhaseCurrents::balanced(100.0, 0.0, Utc::now()).sequence();
        let verdict = PickupVerdict::from_sequence(&seq, &config());

        assert!(!verdict.picked_up);
        assert!(!verdict.blocked);
        assert!((verdict.i1 - 100.0).abs() < 1e-9);
        assert!(verdict.ratio < 1e-9);
    }

    #[test]
    fn test_open_phase_picks_up() {
        let verdict = evaluate_pickup(200.0 / 3.0, 100.0 / 3.0, &config());
        assert!(verdict.picked_up);
        assert!((verdict.ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_at_threshold_does_not_pick_up() {
        let verdict = evaluate_pickup(100.0, 15.0, &config());
        assert!((verdict.ratio - 0.15).abs() < 1e-12);
        assert!(!verdict.picked_up);

        let verdict = evaluate_pickup(100.0, 15.1, &config());
        assert!(verdict.picked_up);
    }

    #[test]
    fn test_security_block_takes_precedence() {
        // Min load = 80 A * 0.08 = 6.4 A
        for i2 in [0.0, 3.0, 10.0, 1000.0] {
            let verdict = evaluate_pickup(5.0, i2, &config());
            assert!(!verdict.picked_up, "i2 = {i2}");
            assert!(verdict.blocked);
        }
    }

    #[test]
    fn test_security_block_still_reports_ratio() {
        let verdict = evaluate_pickup(4.0, 2.0, &config());
        assert!(verdict.blocked);
        assert!((verdict.ratio - 0.5).abs() < 1e-12);
        assert_eq!(verdict.i1, 4.0);
        assert_eq!(verdict.i2, 2.0);
    }

    #[test]
    fn test_zero_i1_ratio_is_zero() {
        let verdict = evaluate_pickup(0.0, 50.0, &config());
        assert_eq!(verdict.ratio, 0.0);
        assert!(!verdict.picked_up);
    }

    #[test]
    fn test_exactly_min_load_is_not_blocked() {
        let config = ProtectionConfig {
            rated_current_amps: 100.0,
            min_load_fraction: 0.5,
            ..Default::default()
        };
        let verdict = evaluate_pickup(50.0, 25.0, &config);
        assert!(!verdict.blocked);
        assert!(verdict.picked_up);
    }

    #[test]
    fn test_light_load_open_phase_blocked() {
        // Phase A open on a 5 A feeder: high ratio but I1 ~ 3.3 A < 6.4 A.
        let seq = PhaseCurrents::balanced(5.0, 0.0, Utc::now())
            .with_open_phase(Phase::A)
            .sequence();
        let verdict = PickupVerdict::from_sequence(&seq, &config());
        assert!(verdict.ratio > config().ratio_threshold);
        assert!(verdict.blocked);
        assert!(!verdict.picked_up);
    }
}
