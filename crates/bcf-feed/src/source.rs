//! Measurement source capability.

use crate::error::FeedResult;
use bcf_core::{DeviceId, PhaseCurrents};
use std::sync::Arc;

/// Supplies the current three-phase snapshot for a monitored device.
///
/// Implementations must return an error for a missing device or malformed
/// data. A zero-current snapshot is a valid measurement, never a stand-in
/// for "no data".
pub trait MeasurementSource: Send + Sync {
    fn snapshot(&self, device: &DeviceId) -> FeedResult<PhaseCurrents>;
}

impl<T: MeasurementSource + ?Sized> MeasurementSource for Arc<T> {
    fn snapshot(&self, device: &DeviceId) -> FeedResult<PhaseCurrents> {
        (**self).snapshot(device)
    }
}
