//! Application configuration.

use crate::error::{AppError, AppResult};
use bcf_core::{DeviceId, Phase};
use bcf_detector::ProtectionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "BCF_CONFIG";

/// Config file used when neither the CLI nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Upper bound for `monitor.cycle_interval_ms` (1 hour).
pub const MAX_CYCLE_INTERVAL_MS: u64 = 3_600_000;

/// Open-phase fault injected into the synthetic feeder at a given cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultSchedule {
    /// Conductor to open.
    pub phase: Phase,
    /// Cycle number (0-based) at which the conductor opens.
    pub open_at_cycle: u64,
    /// Cycle at which the conductor is restored. Never, if absent.
    #[serde(default)]
    pub restore_at_cycle: Option<u64>,
}

/// One monitored device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: DeviceId,
    /// Balanced load current of the synthetic feeder (A).
    pub load_amps: f64,
    /// Load current angle (degrees).
    #[serde(default)]
    pub angle_deg: f64,
    /// Per-device settings. Falls back to the global `[protection]` table.
    #[serde(default)]
    pub protection: Option<ProtectionConfig>,
    #[serde(default)]
    pub fault: Option<FaultSchedule>,
}

impl DeviceConfig {
    pub fn new(id: DeviceId, load_amps: f64) -> Self {
        Self {
            id,
            load_amps,
            angle_deg: 0.0,
            protection: None,
            fault: None,
        }
    }
}

/// Relay loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Evaluation cycle period (ms).
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Stop after this many cycles. Runs until Ctrl-C if absent.
    #[serde(default)]
    pub max_cycles: Option<u64>,
    /// Drive the feeder on a manual clock advanced by one interval per
    /// cycle, without sleeping.
    #[serde(default)]
    pub simulated_time: bool,
}

fn default_cycle_interval_ms() -> u64 {
    100
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            max_cycles: None,
            simulated_time: false,
        }
    }
}

/// JSON Lines output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Records buffered before a flush.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_persistence_enabled() -> bool {
    true
}

fn default_data_dir() -> String {
    "data/relay".to_string()
}

fn default_buffer_size() -> usize {
    100
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            data_dir: default_data_dir(),
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log level; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus text exposition written here at the end of every cycle.
    #[serde(default)]
    pub metrics_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_file: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub protection: ProtectionConfig,
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_devices() -> Vec<DeviceConfig> {
    match DeviceId::new("Line.L1") {
        Ok(id) => vec![DeviceConfig::new(id, 100.0)],
        Err(_) => Vec::new(),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            protection: ProtectionConfig::default(),
            devices: default_devices(),
            monitor: MonitorConfig::default(),
            persistence: PersistenceConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Path resolution: `path` argument, then `BCF_CONFIG`, then
    /// `config/default.toml`. An explicitly named file must exist; a missing
    /// default file falls back to built-in defaults.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let explicit = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok());

        match explicit {
            Some(path) => Self::from_file(&path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                tracing::warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse from TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Effective protection settings for a device.
    pub fn protection_for(&self, device: &DeviceConfig) -> ProtectionConfig {
        device.protection.unwrap_or(self.protection)
    }

    /// Validate configuration values. Fatal at startup.
    pub fn validate(&self) -> AppResult<()> {
        self.protection
            .validate()
            .map_err(|e| AppError::Config(format!("[protection]: {e}")))?;

        if self.devices.is_empty() {
            return Err(AppError::Config("no devices configured".to_string()));
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.id.as_str()) {
                return Err(AppError::Config(format!("duplicate device id {}", device.id)));
            }
            if !device.load_amps.is_finite() || device.load_amps < 0.0 {
                return Err(AppError::Config(format!(
                    "device {}: load_amps must be finite and non-negative, got {}",
                    device.id, device.load_amps
                )));
            }
            if !device.angle_deg.is_finite() {
                return Err(AppError::Config(format!(
                    "device {}: angle_deg must be finite",
                    device.id
                )));
            }
            if let Some(protection) = &device.protection {
                protection
                    .validate()
                    .map_err(|e| AppError::Config(format!("device {}: {e}", device.id)))?;
            }
            if let Some(FaultSchedule {
                open_at_cycle,
                restore_at_cycle: Some(restore),
                ..
            }) = device.fault
            {
                if restore <= open_at_cycle {
                    return Err(AppError::Config(format!(
                        "device {}: restore_at_cycle ({restore}) must be after open_at_cycle ({open_at_cycle})",
                        device.id
                    )));
                }
            }
        }

        let interval = self.monitor.cycle_interval_ms;
        if interval == 0 || interval > MAX_CYCLE_INTERVAL_MS {
            return Err(AppError::Config(format!(
                "monitor.cycle_interval_ms must be in 1..={MAX_CYCLE_INTERVAL_MS}, got {interval}"
            )));
        }

        Ok(())
    }
}
