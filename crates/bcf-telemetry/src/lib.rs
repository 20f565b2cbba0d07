//! Prometheus metrics and structured logging for the 46BC relay.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Per-device sequence current, ratio and trip-state gauges
//! - Trip and measurement-gap counters

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
