//! Error types for bcf-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("Insufficient current data: expected at least {expected} values, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Non-finite current value at index {index}: {value}")]
    NonFinite { index: usize, value: f64 },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
