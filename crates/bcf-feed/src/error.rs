//! Feed error types.

use bcf_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Insufficient data for {device}: expected {expected} values, got {actual}")]
    InsufficientData {
        device: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid data for {device}: {reason}")]
    InvalidData { device: String, reason: String },
}

impl FeedError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceNotFound(_) => "device_not_found",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::InvalidData { .. } => "invalid_data",
        }
    }

    /// Attach a device name to a core parsing error.
    pub fn from_core(device: &str, err: CoreError) -> Self {
        match err {
            CoreError::InsufficientData { expected, actual } => Self::InsufficientData {
                device: device.to_string(),
                expected,
                actual,
            },
            other => Self::InvalidData {
                device: device.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
