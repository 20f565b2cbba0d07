//! Prometheus metrics for the 46BC relay.
//!
//! All metrics are labelled by monitored device.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which must crash at startup. These panics only
//! occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_gauge_vec,
    CounterVec, Encoder, GaugeVec, HistogramVec, IntGaugeVec, TextEncoder,
};

/// Positive-sequence current magnitude (A).
pub static I1_AMPS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bcf_i1_amps",
        "Positive-sequence current magnitude in amperes",
        &["device"]
    )
    .unwrap()
});

/// Negative-sequence current magnitude (A).
pub static I2_AMPS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bcf_i2_amps",
        "Negative-sequence current magnitude in amperes",
        &["device"]
    )
    .unwrap()
});

/// I2/I1 ratio.
pub static RATIO: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!("bcf_i2_i1_ratio", "Negative/positive sequence ratio", &["device"])
        .unwrap()
});

/// Trip timer state (0 = normal, 1 = picked up, 2 = tripped).
pub static TRIP_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "bcf_trip_state",
        "Trip timer state (0=normal, 1=picked_up, 2=tripped)",
        &["device"]
    )
    .unwrap()
});

/// Accumulated continuous pickup time (s).
pub static PICKUP_ELAPSED_SECONDS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bcf_pickup_elapsed_seconds",
        "Continuous pickup time accumulated toward the trip delay",
        &["device"]
    )
    .unwrap()
});

/// Trip commands issued.
pub static TRIPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("bcf_trips_total", "Total trip commands issued", &["device"]).unwrap()
});

/// Cycles skipped because no valid snapshot was available.
pub static MEASUREMENT_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bcf_measurement_errors_total",
        "Evaluation cycles skipped on measurement errors",
        &["device", "kind"]
    )
    .unwrap()
});

/// Pickup episodes that dropped out before the delay (duration in s).
pub static DROPOUT_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "bcf_dropout_seconds",
        "Duration of pickup episodes that cleared before tripping",
        &["device"],
        vec![0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 2.0, 5.0]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record one evaluation cycle.
    pub fn evaluation(device: &str, i1: f64, i2: f64, ratio: f64) {
        I1_AMPS.with_label_values(&[device]).set(i1);
        I2_AMPS.with_label_values(&[device]).set(i2);
        RATIO.with_label_values(&[device]).set(ratio);
    }

    /// Update trip state and accumulated pickup time.
    pub fn trip_state(device: &str, state_code: i64, elapsed_seconds: f64) {
        TRIP_STATE.with_label_values(&[device]).set(state_code);
        PICKUP_ELAPSED_SECONDS
            .with_label_values(&[device])
            .set(elapsed_seconds);
    }

    /// Record a trip command.
    pub fn trip_issued(device: &str) {
        TRIPS_TOTAL.with_label_values(&[device]).inc();
    }

    /// Record a pickup that cleared before tripping.
    pub fn dropout(device: &str, elapsed_seconds: f64) {
        DROPOUT_SECONDS
            .with_label_values(&[device])
            .observe(elapsed_seconds);
    }

    /// Record a skipped cycle.
    pub fn measurement_error(device: &str, kind: &str) {
        MEASUREMENT_ERRORS_TOTAL
            .with_label_values(&[device, kind])
            .inc();
    }

    /// Render the default registry in the Prometheus text format.
    pub fn encode_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }

    /// Write the text exposition to `path` (node-exporter textfile style).
    ///
    /// Writes to a sibling temp file first so scrapers never see a partial file.
    pub fn write_textfile(path: &std::path::Path) -> TelemetryResult<()> {
        let text = Self::encode_text()?;
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_sets_gauges() {
        Metrics::evaluation("test.eval", 66.7, 33.3, 0.5);
        assert_eq!(I1_AMPS.with_label_values(&["test.eval"]).get(), 66.7);
        assert_eq!(RATIO.with_label_values(&["test.eval"]).get(), 0.5);
    }

    #[test]
    fn test_trip_counter() {
        let before = TRIPS_TOTAL.with_label_values(&["test.trip"]).get();
        Metrics::trip_issued("test.trip");
        assert_eq!(TRIPS_TOTAL.with_label_values(&["test.trip"]).get(), before + 1.0);
    }

    #[test]
    fn test_encode_text_contains_metrics() {
        Metrics::trip_state("test.encode", 1, 0.25);
        let text = Metrics::encode_text().unwrap();
        assert!(text.contains("bcf_trip_state"));
        assert!(text.contains("test.encode"));
    }

    #[test]
    fn test_write_textfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bcf.prom");
        Metrics::measurement_error("test.textfile", "device_not_found");

        Metrics::write_textfile(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("bcf_measurement_errors_total"));
        assert!(!dir.path().join("bcf.prom.tmp").exists());
    }
}
