//! Negative-sequence pickup evaluation for the ANSI 46BC element.
//!
//! Applies the minimum-load security block and the I2/I1 ratio check to
//! one snapshot's sequence currents.

pub mod config;
pub mod error;
pub mod evaluator;

pub use config::{ProtectionConfig, MAX_TRIP_DELAY_SECONDS};
pub use error::{DetectorError, DetectorResult};
pub use evaluator::{evaluate_pickup, PickupVerdict};
