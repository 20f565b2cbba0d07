//! Monitor application.
//!
//! Runs one `ProtectionRelay` per configured device against the synthetic
//! feeder, injects scheduled conductor faults, persists every evaluation
//! and forwards trips to each device's own breaker command sink.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::relay::{EvaluationRecord, ProtectionRelay};
use bcf_core::DeviceId;
use bcf_feed::{FeederLoad, SyntheticFeeder};
use bcf_persistence::JsonLinesWriter;
use bcf_telemetry::Metrics;
use bcf_trip::{BreakerCommand, TripEvent, TripLatch, TripState};
use chrono::{TimeDelta, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Result of one monitor cycle.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// 0-based cycle number.
    pub cycle: u64,
    pub records: Vec<EvaluationRecord>,
    /// Devices skipped on measurement errors.
    pub skipped: usize,
    /// Records that could not be persisted this cycle.
    pub persistence_errors: usize,
}

/// Totals over a monitor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub evaluations: u64,
    pub skipped: u64,
    pub trips: u64,
    pub persistence_errors: u64,
}

/// A relay and the breaker it commands.
struct Bay {
    relay: ProtectionRelay,
    breaker: Arc<dyn BreakerCommand>,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    feeder: Arc<SyntheticFeeder>,
    bays: Vec<Bay>,
    evaluation_writer: Option<JsonLinesWriter<EvaluationRecord>>,
    trip_writer: Option<JsonLinesWriter<TripEvent>>,
    cycle: u64,
    stats: RunStats,
}

impl Application {
    /// Create the application with a latching trip output per device.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Self::with_breakers(config, |_| Arc::new(TripLatch::new()))
    }

    /// Create the application with custom breaker command sinks.
    ///
    /// `breaker_for` is called once per configured device.
    pub fn with_breakers<F>(config: AppConfig, mut breaker_for: F) -> AppResult<Self>
    where
        F: FnMut(&DeviceId) -> Arc<dyn BreakerCommand>,
    {
        config.validate()?;

        let feeder = if config.monitor.simulated_time {
            Arc::new(SyntheticFeeder::with_manual_clock(Utc::now()))
        } else {
            Arc::new(SyntheticFeeder::new())
        };

        let mut bays = Vec::with_capacity(config.devices.len());
        for device in &config.devices {
            feeder.add_device(
                device.id.clone(),
                FeederLoad::new(device.load_amps, device.angle_deg),
            );
            let protection = config.protection_for(device);
            bays.push(Bay {
                relay: ProtectionRelay::new(device.id.clone(), protection)?,
                breaker: breaker_for(&device.id),
            });
            info!(
                device = %device.id,
                load_amps = device.load_amps,
                ratio_threshold = protection.ratio_threshold,
                min_load_amps = protection.min_load_amps(),
                trip_delay_seconds = protection.trip_delay_seconds,
                "Relay configured"
            );
        }

        let (evaluation_writer, trip_writer) = if config.persistence.enabled {
            let dir = &config.persistence.data_dir;
            let size = config.persistence.buffer_size;
            (
                Some(JsonLinesWriter::new(dir, "evaluations", size)),
                // Trips are rare; write each one immediately
                Some(JsonLinesWriter::new(dir, "trips", 1)),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            config,
            feeder,
            bays,
            evaluation_writer,
            trip_writer,
            cycle: 0,
            stats: RunStats::default(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Feeder model the relays measure.
    pub fn feeder(&self) -> &Arc<SyntheticFeeder> {
        &self.feeder
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Trip state of a device's relay.
    pub fn relay_state(&self, device: &DeviceId) -> Option<TripState> {
        self.bays
            .iter()
            .find(|b| b.relay.device() == device)
            .map(|b| b.relay.state())
    }

    /// Operator acknowledge for one device: resets its relay and releases
    /// its breaker command. Other devices are untouched.
    pub fn acknowledge_trip(&mut self, device: &DeviceId) -> AppResult<()> {
        let bay = self
            .bays
            .iter_mut()
            .find(|b| b.relay.device() == device)
            .ok_or_else(|| AppError::Config(format!("unknown device {device}")))?;
        bay.relay.acknowledge_trip();
        bay.breaker.acknowledge();
        info!(device = %device, "Trip acknowledged");
        Ok(())
    }

    fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.config.monitor.cycle_interval_ms)
    }

    fn finished(&self) -> bool {
        self.config
            .monitor
            .max_cycles
            .is_some_and(|max| self.cycle >= max)
    }

    fn apply_fault_schedule(&self) -> AppResult<()> {
        for device in &self.config.devices {
            let Some(fault) = device.fault else {
                continue;
            };
            if fault.open_at_cycle == self.cycle {
                self.feeder.open_phase(&device.id, fault.phase)?;
            }
            if fault.restore_at_cycle == Some(self.cycle) {
                self.feeder.close_phase(&device.id, fault.phase)?;
            }
        }
        Ok(())
    }

    /// Evaluate every device once.
    ///
    /// Measurement errors skip only the affected device. Persistence errors
    /// are logged and counted; the breaker command and the rest of the
    /// cycle still go ahead.
    pub fn run_cycle(&mut self) -> AppResult<CycleSummary> {
        self.apply_fault_schedule()?;

        let mut records = Vec::with_capacity(self.bays.len());
        let mut skipped = 0;
        let mut persistence_errors = 0;

        for bay in &mut self.bays {
            let record = match bay.relay.run_cycle(self.feeder.as_ref()) {
                Ok(record) => record,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            if let Some(trip) = &record.trip {
                bay.breaker.trip(trip);
                self.stats.trips += 1;
                if let Some(writer) = self.trip_writer.as_mut() {
                    if let Err(e) = writer.add_record(trip.clone()) {
                        error!(
                            device = %trip.device,
                            event_id = %trip.event_id,
                            error = %e,
                            "Failed to persist trip event"
                        );
                        persistence_errors += 1;
                    }
                }
            }
            if let Some(writer) = self.evaluation_writer.as_mut() {
                if let Err(e) = writer.add_record(record.clone()) {
                    warn!(device = %record.device, error = %e, "Failed to persist evaluation");
                    persistence_errors += 1;
                }
            }
            records.push(record);
        }

        if self.config.monitor.simulated_time {
            let step = TimeDelta::milliseconds(
                i64::try_from(self.config.monitor.cycle_interval_ms).unwrap_or(i64::MAX),
            );
            self.feeder.advance(step);
        }

        self.write_metrics_file();

        let summary = CycleSummary {
            cycle: self.cycle,
            records,
            skipped,
            persistence_errors,
        };
        debug!(
            cycle = summary.cycle,
            evaluated = summary.records.len(),
            skipped,
            persistence_errors,
            "Cycle complete"
        );

        self.cycle += 1;
        self.stats.cycles += 1;
        self.stats.evaluations += summary.records.len() as u64;
        self.stats.skipped += skipped as u64;
        self.stats.persistence_errors += persistence_errors as u64;

        Ok(summary)
    }

    fn write_metrics_file(&self) {
        if let Some(path) = &self.config.telemetry.metrics_file {
            if let Err(e) = Metrics::write_textfile(Path::new(path)) {
                warn!(?e, path = %path, "Failed to write metrics file");
            }
        }
    }

    /// Run the monitor loop until `max_cycles` or Ctrl-C.
    ///
    /// On wall-clock time cycles are paced by a tokio interval. On simulated
    /// time they run back to back.
    pub async fn run(mut self) -> AppResult<RunStats> {
        info!(
            devices = self.bays.len(),
            cycle_interval_ms = self.config.monitor.cycle_interval_ms,
            max_cycles = ?self.config.monitor.max_cycles,
            simulated_time = self.config.monitor.simulated_time,
            "Starting relay monitor"
        );

        let mut interval = tokio::time::interval(self.cycle_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        while !self.finished() {
            if self.config.monitor.simulated_time {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        info!("Shutdown signal received");
                        break;
                    }
                    _ = tokio::task::yield_now() => {}
                }
            } else {
                tokio::select! {
                    _ = &mut shutdown => {
                        info!("Shutdown signal received");
                        break;
                    }
                    _ = interval.tick() => {}
                }
            }

            self.run_cycle()?;
        }

        self.close()?;

        info!(
            cycles = self.stats.cycles,
            evaluations = self.stats.evaluations,
            skipped = self.stats.skipped,
            trips = self.stats.trips,
            persistence_errors = self.stats.persistence_errors,
            "Relay monitor stopped"
        );
        Ok(self.stats)
    }

    /// Flush persistence and write final metrics.
    ///
    /// Both writers are closed even when the first one fails; the first
    /// error is returned.
    pub fn close(&mut self) -> AppResult<()> {
        let evaluations = self
            .evaluation_writer
            .as_mut()
            .map_or(Ok(()), JsonLinesWriter::close);
        let trips = self
            .trip_writer
            .as_mut()
            .map_or(Ok(()), JsonLinesWriter::close);
        self.write_metrics_file();
        evaluations?;
        trips?;
        Ok(())
    }
}
