//! Hydrochron daemon entry point
//!
//! Runs one complete dishwasher program: identify, start, sequence,
//! shut down, then exits once telemetry has finished.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hydrochron_core::signal::TransitionSignal;
use hydrochron_daemon::clock::UnixClock;
use hydrochron_daemon::config::{load_config, Config};
use hydrochron_daemon::energy::EnergyMeter;
use hydrochron_daemon::hardware::linux::{EdgeWatcher, SysfsMachine};
use hydrochron_daemon::hardware::sim::{autopilot, SimulatedMachine};
use hydrochron_daemon::hardware::{SharedMachine, SharedSignal};
use hydrochron_daemon::recorder::spawn_recorder;
use hydrochron_daemon::sinks::{BackendClient, SerialDisplay, Sinks};
use hydrochron_daemon::tasks::{CollectorSettings, Supervisor, SupervisorSettings, TelemetryCollector};
use hydrochron_hal::Machine;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Dishwasher program sequencer
#[derive(Parser, Debug)]
#[command(name = "hydrochron")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "hydrochron.toml")]
    config: PathBuf,

    /// Run against the simulated appliance
    #[arg(long)]
    simulate: bool,

    /// Seconds between simulated step contact pulses
    #[arg(long, default_value_t = 2)]
    sim_step_secs: u64,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// The appliance the daemon drives
enum Appliance {
    Linux {
        machine: Arc<SysfsMachine>,
        _watcher: EdgeWatcher,
    },
    Simulated(Arc<SimulatedMachine>),
}

impl Appliance {
    fn open(config: &Config, simulate: bool, signal: &SharedSignal) -> Result<Self> {
        if simulate {
            info!("Using simulated appliance");
            return Ok(Appliance::Simulated(Arc::new(SimulatedMachine::new(200))));
        }
        let machine = Arc::new(
            SysfsMachine::open(&config.hardware).context("Failed to set up GPIO lines")?,
        );
        let watcher = machine
            .watch_step_contact(signal.clone())
            .context("Failed to watch step contact")?;
        Ok(Appliance::Linux {
            machine,
            _watcher: watcher,
        })
    }

    fn shared(&self) -> SharedMachine {
        match self {
            Appliance::Linux { machine, .. } => machine.clone() as SharedMachine,
            Appliance::Simulated(machine) => machine.clone() as SharedMachine,
        }
    }
}

fn build_sinks(config: &Config) -> Result<Sinks> {
    let telemetry = &config.telemetry;
    let backend = match &telemetry.backend_base_url {
        Some(url) => {
            info!(%url, "Backend reporting enabled");
            Some(BackendClient::new(url).context("Failed to build HTTP client")?)
        }
        None => None,
    };
    let display = telemetry.serial_port.as_ref().map(|port| {
        info!(%port, baud = telemetry.serial_baud, "Serial display enabled");
        SerialDisplay::new(port.clone(), telemetry.serial_baud)
    });
    Ok(Sinks { backend, display })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    std::fs::create_dir_all(&config.telemetry.log_directory)
        .context("Failed to create log directory")?;

    let clock = UnixClock::system();
    let calibration = config.program.calibration();
    let signal: SharedSignal = Arc::new(TransitionSignal::new());
    let appliance = Appliance::open(&config, args.simulate, &signal)?;
    let machine = appliance.shared();

    let pilot = CancellationToken::new();
    if let Appliance::Simulated(sim) = &appliance {
        tokio::spawn(autopilot(
            sim.clone(),
            signal.clone(),
            Duration::from_secs(args.sim_step_secs),
            pilot.clone(),
        ));
    }

    let (recorder, recorder_task) = spawn_recorder(config.telemetry.log_directory.clone());
    let supervisor = Supervisor::new(
        SupervisorSettings::from_config(&config),
        calibration,
        machine.clone(),
        signal,
        recorder,
        clock,
    );

    let energy = EnergyMeter::connect(config.telemetry.energy_meter_host.as_deref())
        .await
        .context("Failed to build energy meter client")?;
    let collector = TelemetryCollector::spawn(
        CollectorSettings {
            interval: config.telemetry.interval(),
            afterrunning_secs: config.telemetry.afterrunning_secs,
            device_identifier: config.machine.device_identifier.clone(),
        },
        calibration,
        machine.clone(),
        supervisor.subscribe(),
        energy,
        build_sinks(&config)?,
        clock,
    );
    let collector_stopper = collector.stopper();

    tokio::select! {
        _ = supervisor.run(collector) => info!("Run finished"),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, switching the appliance off");
            machine.set_led(false);
            machine.set_main_relay(false);
            machine.set_all_relays(false);
            collector_stopper.stop().await;
        }
    }

    pilot.cancel();
    if let Err(e) = recorder_task.await {
        warn!(error = %e, "Recorder task failed");
    }
    Ok(())
}
