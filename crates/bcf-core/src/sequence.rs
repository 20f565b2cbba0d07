//! Symmetrical components (Fortescue transform).
//!
//! ```text
//! I0 = (Ia +    Ib +    Ic) / 3
//! I1 = (Ia +  a·Ib + a²·Ic) / 3
//! I2 = (Ia + a²·Ib +  a·Ic) / 3
//! ```
//!
//! with `a = e^{j120°}`. Only magnitudes leave this module.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

const SQRT3_OVER_2: f64 = 0.866_025_403_784_438_6;

/// Rotation operator `a = 1∠120°`.
pub const A: Complex64 = Complex64::new(-0.5, SQRT3_OVER_2);

/// `a² = 1∠240°`.
pub const A2: Complex64 = Complex64::new(-0.5, -SQRT3_OVER_2);

/// Sequence current magnitudes in amperes. Always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceCurrents {
    /// Zero-sequence magnitude. Reported, not used for pickup.
    pub i0: f64,
    /// Positive-sequence magnitude.
    pub i1: f64,
    /// Negative-sequence magnitude.
    pub i2: f64,
}

/// Compute sequence magnitudes from the three phase phasors.
///
/// Defined for every complex input, including all-zero.
pub fn sequence_components(ia: Complex64, ib: Complex64, ic: Complex64) -> SequenceCurrents {
    let i0 = (ia + ib + ic) / 3.0;
    let i1 = (ia + A * ib + A2 * ic) / 3.0;
    let i2 = (ia + A2 * ib + A * ic) / 3.0;

    SequenceCurrents {
        i0: i0.norm(),
        i1: i1.norm(),
        i2: i2.norm(),
    }
}
