//! ANSI 46BC broken-conductor relay.
//!
//! Wires the components into a working relay:
//! - Measurement source (synthetic feeder standing in for the circuit solver)
//! - Symmetrical components and pickup evaluation
//! - Definite-time trip timer and trip output
//! - JSON Lines records, Prometheus metrics, structured logs

pub mod app;
pub mod config;
pub mod error;
pub mod relay;
pub mod scenario;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use relay::{EvaluationRecord, ProtectionRelay};
