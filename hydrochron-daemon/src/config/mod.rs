//! Daemon configuration
//!
//! Loaded from a TOML file. Every tunable the sequencer and the collector
//! need is passed explicitly into their constructors from here.

pub mod loader;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub use loader::load_config;

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub machine: MachineSection,
    pub program: ProgramSection,
    pub telemetry: TelemetrySection,
    #[serde(default)]
    pub hardware: HardwareSection,
}

/// `[machine]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineSection {
    /// Reported to the backend with every record
    pub device_identifier: String,
    /// Re-scan interval while no program is selected
    pub program_poll_secs: u64,
    /// Poll interval while waiting for the zero position after a run
    pub zero_position_poll_millis: u64,
    /// Relay settle time before reading the selector
    pub selector_settle_millis: u64,
}

impl Default for MachineSection {
    fn default() -> Self {
        Self {
            device_identifier: "unknown".to_string(),
            program_poll_secs: 30,
            zero_position_poll_millis: 500,
            selector_settle_millis: 500,
        }
    }
}

impl MachineSection {
    pub fn program_poll(&self) -> Duration {
        Duration::from_secs(self.program_poll_secs)
    }

    pub fn zero_position_poll(&self) -> Duration {
        Duration::from_millis(self.zero_position_poll_millis)
    }

    pub fn selector_settle(&self) -> Duration {
        Duration::from_millis(self.selector_settle_millis)
    }
}

/// `[program]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramSection {
    /// Heating rate in °C per second
    pub gradient: f64,
    #[serde(default)]
    pub sensor_targets: SensorTargetsSection,
}

/// `[program.sensor_targets]`: probe reading (°C) per nominal target
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorTargetsSection {
    pub target_45: f64,
    pub target_56: f64,
    pub target_66: f64,
}

impl Default for SensorTargetsSection {
    fn default() -> Self {
        Self {
            target_45: 45.0,
            target_56: 56.0,
            target_66: 66.0,
        }
    }
}

/// `[telemetry]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_afterrunning_secs")]
    pub afterrunning_secs: u64,
    pub backend_base_url: Option<String>,
    pub energy_meter_host: Option<String>,
    pub serial_port: Option<String>,
    #[serde(default = "default_serial_baud")]
    pub serial_baud: u32,
    pub log_directory: PathBuf,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_afterrunning_secs() -> u64 {
    1800
}

fn default_serial_baud() -> u32 {
    9600
}

impl TelemetrySection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Longest the supervisor waits for reporting to finish after a run
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.afterrunning_secs + 2 * self.interval_secs)
    }
}

/// `[hardware]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HardwareSection {
    pub gpio_root: PathBuf,
    pub w1_root: PathBuf,
    /// 1-wire thermometer id, e.g. `28-0316a2797aff`
    pub w1_device: String,
    /// Input pin numbers by line name (actuator lines and selector `p4`..`p12`)
    pub inputs: BTreeMap<String, u32>,
    /// Output pin numbers by line name
    pub outputs: BTreeMap<String, u32>,
}

impl Default for HardwareSection {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            w1_root: PathBuf::from("/sys/bus/w1/devices"),
            w1_device: String::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}
