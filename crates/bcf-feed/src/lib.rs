//! Measurement sources for the 46BC relay.
//!
//! The relay never solves the circuit itself. It asks a `MeasurementSource`
//! for the latest three-phase current snapshot of a named device:
//! - `SnapshotStore`: latest raw terminal readings pushed by an external solver
//! - `SyntheticFeeder`: balanced-load feeder model with switchable open phases

pub mod error;
pub mod source;
pub mod store;
pub mod synthetic;

pub use error::{FeedError, FeedResult};
pub use source::MeasurementSource;
pub use store::SnapshotStore;
pub use synthetic::{FeederLoad, SyntheticFeeder};
