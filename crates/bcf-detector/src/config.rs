//! Protection settings.

use crate::error::{DetectorError, DetectorResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest accepted definite-time delay (s).
pub const MAX_TRIP_DELAY_SECONDS: f64 = 86_400.0;

/// ANSI 46BC settings for one relay.
///
/// Immutable once a relay is built from it. Call [`ProtectionConfig::validate`]
/// (relay constructors do) before evaluating with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectionConfig {
    /// I2/I1 ratio above which the element picks up. Must be in (0, 1).
    #[serde(default = "default_ratio_threshold")]
    pub ratio_threshold: f64,
    /// Rated current of the protected feeder (A). Must be positive.
    #[serde(default = "default_rated_current_amps")]
    pub rated_current_amps: f64,
    /// Fraction of rated current below which pickup is blocked. Must be in (0, 1).
    #[serde(default = "default_min_load_fraction")]
    pub min_load_fraction: f64,
    /// Definite-time delay before tripping (s). Must be non-negative.
    #[serde(default = "default_trip_delay_seconds")]
    pub trip_delay_seconds: f64,
}

fn default_ratio_threshold() -> f64 {
    0.15
}

fn default_rated_current_amps() -> f64 {
    80.0
}

fn default_min_load_fraction() -> f64 {
    0.08
}

fn default_trip_delay_seconds() -> f64 {
    1.0
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: default_ratio_threshold(),       // 15% I2/I1
            rated_current_amps: default_rated_current_amps(), // LV feeder
            min_load_fraction: default_min_load_fraction(),   // 8% of rated
            trip_delay_seconds: default_trip_delay_seconds(), // 1 s definite time
        }
    }
}

impl ProtectionConfig {
    /// Validate configuration values.
    ///
    /// Returns Err if:
    /// - ratio_threshold is outside (0, 1)
    /// - rated_current_amps is not positive
    /// - min_load_fraction is outside (0, 1)
    /// - trip_delay_seconds is negative or above one day
    /// - any value is not finite
    pub fn validate(&self) -> DetectorResult<()> {
        let fields = [
            ("ratio_threshold", self.ratio_threshold),
            ("rated_current_amps", self.rated_current_amps),
            ("min_load_fraction", self.min_load_fraction),
            ("trip_delay_seconds", self.trip_delay_seconds),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(DetectorError::Config(format!(
                    "{name} ({value}) must be finite"
                )));
            }
        }

        if self.ratio_threshold <= 0.0 || self.ratio_threshold >= 1.0 {
            return Err(DetectorError::Config(format!(
                "ratio_threshold ({}) must be between 0 and 1 exclusive",
                self.ratio_threshold
            )));
        }

        if self.rated_current_amps <= 0.0 {
            return Err(DetectorError::Config(format!(
                "rated_current_amps ({}) must be positive",
                self.rated_current_amps
            )));
        }

        if self.min_load_fraction <= 0.0 || self.min_load_fraction >= 1.0 {
            return Err(DetectorError::Config(format!(
                "min_load_fraction ({}) must be between 0 and 1 exclusive",
                self.min_load_fraction
            )));
        }

        if self.trip_delay_seconds < 0.0 {
            return Err(DetectorError::Config(format!(
                "trip_delay_seconds ({}) must be non-negative",
                self.trip_delay_seconds
            )));
        }

        if self.trip_delay_seconds > MAX_TRIP_DELAY_SECONDS {
            return Err(DetectorError::Config(format!(
                "trip_delay_seconds ({}) must not exceed {MAX_TRIP_DELAY_SECONDS}",
                self.trip_delay_seconds
            )));
        }

        Ok(())
    }

    /// Minimum positive-sequence current for the element to operate (A).
    pub fn min_load_amps(&self) -> f64 {
        self.rated_current_amps * self.min_load_fraction
    }

    /// Definite-time delay as a `Duration`.
    pub fn trip_delay(&self) -> DetectorResult<Duration> {
        Duration::try_from_secs_f64(self.trip_delay_seconds).map_err(|e| {
            DetectorError::Config(format!(
                "trip_delay_seconds ({}) is not a valid duration: {e}",
                self.trip_delay_seconds
            ))
        })
    }
}
