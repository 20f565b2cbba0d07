//! Trip output latch and breaker command seam.
//!
//! BreakerCommand: where a trip event leaves the relay. One sink per
//! protected device.
//! TripLatch: a BreakerCommand that, once operated, stays operated until an
//! operator acknowledges it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::timer::TripEvent;

// ============================================================================
// BreakerCommand
// ============================================================================

/// Receives trip commands for one protected device.
///
/// `trip` is called once per entry into TRIPPED; implementations must not
/// assume they will be called again for the same trip. `acknowledge` is
/// called when the operator resets the device's relay.
pub trait BreakerCommand: Send + Sync {
    fn trip(&self, event: &TripEvent);

    fn acknowledge(&self);
}

// ============================================================================
// TripLatch
// ============================================================================

/// Latched trip output.
///
/// Thread-safe: can be shared across tasks via `Arc<TripLatch>`.
pub struct TripLatch {
    /// Operated flag.
    operated: AtomicBool,
    /// Total trip commands received since creation.
    trip_count: AtomicU64,
    /// Event that operated the latch.
    event: RwLock<Option<TripEvent>>,
}

impl Default for TripLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl TripLatch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operated: AtomicBool::new(false),
            trip_count: AtomicU64::new(0),
            event: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn is_operated(&self) -> bool {
        self.operated.load(Ordering::SeqCst)
    }

    /// Event that operated the latch, if operated.
    #[must_use]
    pub fn event(&self) -> Option<TripEvent> {
        if self.is_operated() {
            self.event.read().clone()
        } else {
            None
        }
    }

    /// Number of trip commands received, including ones that arrived while
    /// already operated.
    #[must_use]
    pub fn trip_count(&self) -> u64 {
        self.trip_count.load(Ordering::SeqCst)
    }
}

impl BreakerCommand for TripLatch {
    fn trip(&self, event: &TripEvent) {
        self.trip_count.fetch_add(1, Ordering::SeqCst);

        if self
            .operated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.event.write() = Some(event.clone());
            error!(
                device = %event.device,
                event_id = %event.event_id,
                ratio = event.ratio,
                i1 = event.i1,
                i2 = event.i2,
                "*** TRIP COMMAND ISSUED ***"
            );
        } else {
            warn!(
                device = %event.device,
                event_id = %event.event_id,
                "Trip latch already operated, keeping original event"
            );
        }
    }

    /// Operator acknowledge.
    fn acknowledge(&self) {
        if self.is_operated() {
            let previous = self.event.read().clone();
            info!(previous_event = ?previous.map(|e| e.event_id), "Trip latch acknowledged");

            self.operated.store(false, Ordering::SeqCst);
            *self.event.write() = None;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
