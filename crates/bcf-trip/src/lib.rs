//! Definite-time trip logic for the ANSI 46BC element.
//!
//! Provides:
//! - TripTimer: NORMAL / PICKED_UP / TRIPPED state machine accumulating
//!   continuous pickup time across snapshots
//! - TripLatch: trip output that, once operated, stays operated until
//!   acknowledged
//! - BreakerCommand: seam through which a trip reaches the breaker

pub mod latch;
pub mod timer;

pub use latch::{BreakerCommand, TripLatch};
pub use timer::{Transition, TripEvent, TripState, TripTimer};
