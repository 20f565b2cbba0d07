//! Three-phase current phasor snapshots.
//!
//! A `PhaseCurrents` value is the input unit of the relay: one complex
//! current per phase, in amperes, taken at a single instant.

use crate::error::{CoreError, Result};
use crate::sequence::{sequence_components, SequenceCurrents};
use chrono::{DateTime, Utc};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of real values the solver reports for one three-phase terminal
/// (`re`/`im` pair per phase).
pub const TERMINAL_VALUE_COUNT: usize = 6;

/// Phase designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    /// Nominal angle of this phase in a balanced abc system (degrees).
    pub fn nominal_angle_deg(self) -> f64 {
        match self {
            Self::A => 0.0,
            Self::B => -120.0,
            Self::C => 120.0,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

/// Three-phase current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseCurrents {
    /// Phase A current (A).
    pub ia: Complex64,
    /// Phase B current (A).
    pub ib: Complex64,
    /// Phase C current (A).
    pub ic: Complex64,
    /// Time the snapshot was measured.
    pub measured_at: DateTime<Utc>,
}

impl PhaseCurrents {
    pub fn new(ia: Complex64, ib: Complex64, ic: Complex64, measured_at: DateTime<Utc>) -> Self {
        Self {
            ia,
            ib,
            ic,
            measured_at,
        }
    }

    /// Balanced abc set with the given RMS magnitude and phase-A angle.
    pub fn balanced(magnitude: f64, angle_deg: f64, measured_at: DateTime<Utc>) -> Self {
        let phasor = |phase: Phase| {
            Complex64::from_polar(
                magnitude,
                (angle_deg + phase.nominal_angle_deg()).to_radians(),
            )
        };
        Self::new(phasor(Phase::A), phasor(Phase::B), phasor(Phase::C), measured_at)
    }

    /// Build from the solver's flat terminal current layout:
    /// `[Ia.re, Ia.im, Ib.re, Ib.im, Ic.re, Ic.im, ...]`.
    ///
    /// Only the first terminal (first six values) is used. Fewer than six
    /// values or any non-finite value is rejected rather than read as zero.
    pub fn from_terminal_values(values: &[f64], measured_at: DateTime<Utc>) -> Result<Self> {
        if values.len() < TERMINAL_VALUE_COUNT {
            return Err(CoreError::InsufficientData {
                expected: TERMINAL_VALUE_COUNT,
                actual: values.len(),
            });
        }

        let terminal = &values[..TERMINAL_VALUE_COUNT];
        if let Some((index, &value)) = terminal.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(CoreError::NonFinite { index, value });
        }

        Ok(Self::new(
            Complex64::new(terminal[0], terminal[1]),
            Complex64::new(terminal[2], terminal[3]),
            Complex64::new(terminal[4], terminal[5]),
            measured_at,
        ))
    }

    /// Current of a single phase.
    pub fn phase(&self, phase: Phase) -> Complex64 {
        match phase {
            Phase::A => self.ia,
            Phase::B => self.ib,
            Phase::C => self.ic,
        }
    }

    /// Copy of this snapshot with one phase forced to zero current.
    pub fn with_open_phase(mut self, phase: Phase) -> Self {
        match phase {
            Phase::A => self.ia = Complex64::new(0.0, 0.0),
            Phase::B => self.ib = Complex64::new(0.0, 0.0),
            Phase::C => self.ic = Complex64::new(0.0, 0.0),
        }
        self
    }

    /// Copy of this snapshot with every phase scaled by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(
            self.ia * factor,
            self.ib * factor,
            self.ic * factor,
            self.measured_at,
        )
    }

    /// Symmetrical-component magnitudes of this snapshot.
    pub fn sequence(&self) -> SequenceCurrents {
        sequence_components(self.ia, self.ib, self.ic)
    }
}
