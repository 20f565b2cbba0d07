//! ANSI 46BC Broken-Conductor Relay - Entry Point
//!
//! `demo`: healthy and open-phase cases on a simulated feeder (default)
//! `demo --json`: healthy vs. faulted sequence currents as JSON
//! `monitor`: multi-device relay loop with persistence and metrics

use anyhow::Result;
use bcf_feed::FeederLoad;
use bcf_relay::scenario::{comparison_report, run_demo};
use bcf_relay::{AppConfig, Application};
use clap::{Parser, Subcommand};
use tracing::info;

/// ANSI 46BC broken-conductor relay
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BCF_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the healthy / broken-conductor demo cases
    Demo {
        /// Print healthy vs. faulted I1/I2 as JSON and exit
        #[arg(long)]
        json: bool,
    },
    /// Run the relay loop over the configured devices
    Monitor {
        /// Stop after this many cycles (overrides the config file)
        #[arg(long)]
        cycles: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    config.validate()?;

    bcf_telemetry::init_logging(&config.telemetry.log_level)?;
    info!("Starting bcf-relay v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Demo { json: false }) {
        Command::Demo { json } => {
            // The first configured device drives the demo feeder
            let (load, protection) = match config.devices.first() {
                Some(device) => (
                    FeederLoad::new(device.load_amps, device.angle_deg),
                    config.protection_for(device),
                ),
                None => (FeederLoad::new(100.0, 0.0), config.protection),
            };

            if json {
                let report = comparison_report(load)?;
                println!("{}", serde_json::to_string(&report)?);
                return Ok(());
            }

            println!("{}", "-".repeat(50));
            println!("--- Broken Conductor Detection: Relay Simulation ---");
            for outcome in run_demo(load.load_amps, &protection)? {
                println!();
                println!("{outcome}");
            }
            println!("{}", "-".repeat(50));
        }
        Command::Monitor { cycles } => {
            if cycles.is_some() {
                config.monitor.max_cycles = cycles;
            }
            let app = Application::new(config)?;
            let stats = app.run().await?;
            info!(?stats, "Monitor finished");
        }
    }

    Ok(())
}
