//! Configuration file loading and validation

use std::path::Path;

use hydrochron_core::program::{Calibration, SensorTargets};
use tracing::info;

use super::{Config, ProgramSection};
use crate::error::{Error, Result};

/// Load and validate the configuration file
pub fn load_config(path: &Path) -> Result<Config> {
    info!(path = %path.display(), "Loading configuration");
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Parse and validate configuration text
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config = toml::from_str(text)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let program = &config.program;
    if !program.gradient.is_finite() || program.gradient <= 0.0 {
        return Err(Error::Config(format!(
            "program.gradient must be positive, got {}",
            program.gradient
        )));
    }
    let micro = program.gradient * MICRO_PER_UNIT;
    if micro < 1.0 || micro > u32::MAX as f64 || (micro - micro.round()).abs() > 1e-6 {
        return Err(Error::Config(format!(
            "program.gradient {} is not a whole number of micro-degrees per second",
            program.gradient
        )));
    }
    if config.telemetry.interval_secs == 0 {
        return Err(Error::Config("telemetry.interval_secs must be at least 1".into()));
    }
    if config.telemetry.log_directory.as_os_str().is_empty() {
        return Err(Error::Config("telemetry.log_directory must be set".into()));
    }
    Ok(())
}

const MICRO_PER_UNIT: f64 = 1_000_000.0;

fn to_x10(celsius: f64) -> i16 {
    (celsius * 10.0).round() as i16
}

impl ProgramSection {
    /// Thermal calibration for the time model
    pub fn calibration(&self) -> Calibration {
        let targets = &self.sensor_targets;
        Calibration {
            gradient_udeg_per_s: (self.gradient * MICRO_PER_UNIT).round() as u32,
            sensor_targets: SensorTargets {
                target_45_x10: to_x10(targets.target_45),
                target_56_x10: to_x10(targets.target_56),
                target_66_x10: to_x10(targets.target_66),
            },
        }
    }
}
