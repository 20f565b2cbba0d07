//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] bcf_core::CoreError),

    #[error("Measurement error: {0}")]
    Measurement(#[from] bcf_feed::FeedError),

    #[error("Detector error: {0}")]
    Detector(#[from] bcf_detector::DetectorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] bcf_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] bcf_persistence::PersistenceError),
}

pub type AppResult<T> = Result<T, AppError>;
