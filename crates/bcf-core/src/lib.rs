//! Core domain types for the ANSI 46BC broken-conductor relay.
//!
//! This crate provides the fundamental types used throughout the relay:
//! - `DeviceId`: Identifier of a monitored line/feeder element
//! - `PhaseCurrents`: One three-phase current phasor snapshot
//! - `SequenceCurrents`: Symmetrical-component magnitudes (I0, I1, I2)
//! - `sequence_components`: Fortescue transform

pub mod device;
pub mod error;
pub mod phasor;
pub mod sequence;

pub use device::DeviceId;
pub use error::{CoreError, Result};
pub use num_complex::Complex64;
pub use phasor::{Phase, PhaseCurrents};
pub use sequence::{sequence_components, SequenceCurrents};
