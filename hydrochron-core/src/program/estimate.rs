//! Time-left estimation
//!
//! Ordinary steps run for their nominal duration. Thermo-stop steps last
//! until the water reaches its target, modelled as a linear temperature
//! rise at a configured gradient:
//!
//! ```text
//! time_total   = (target  - start) / gradient
//! time_elapsed = (current - start) / gradient
//! time_left    = time_total - time_elapsed
//! ```
//!
//! Estimates may go negative when a step overshoots; callers decide what
//! that means.

use crate::program::run_state::ProgramRunState;
use crate::steps::{
    assumed_start_temperature_x10, is_thermo_stop, next_step, nominal_duration_secs,
    target_temperature, ESTIMATE_HORIZON,
};
use crate::catalog::last_step;
use crate::{ProgramId, StepId, Timestamp};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sensor readings (0.1°C) at which the appliance thermostat releases
///
/// The cam's nominal targets are 45, 56 and 66°C; the probe sits
/// somewhere else in the water circuit, so each target is calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorTargets {
    pub target_45_x10: i16,
    pub target_56_x10: i16,
    pub target_66_x10: i16,
}

impl Default for SensorTargets {
    fn default() -> Self {
        Self {
            target_45_x10: 450,
            target_56_x10: 560,
            target_66_x10: 660,
        }
    }
}

impl SensorTargets {
    /// Sensor reading for a nominal target (°C)
    pub fn resolve(&self, nominal_c: u8) -> i16 {
        match nominal_c {
            0 => 0,
            45 => self.target_45_x10,
            56 => self.target_56_x10,
            66 => self.target_66_x10,
            other => other as i16 * 10,
        }
    }
}

/// Thermal calibration for the time model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Calibration {
    /// Heating rate in micro-°C per second (0.1°C/s = 100_000)
    pub gradient_udeg_per_s: u32,
    /// Thermostat release points
    pub sensor_targets: SensorTargets,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            gradient_udeg_per_s: 100_000,
            sensor_targets: SensorTargets::default(),
        }
    }
}

impl Calibration {
    /// Seconds to heat across a temperature span (0.1°C units), rounded
    pub fn heating_secs(&self, span_x10: i32) -> i64 {
        let gradient = self.gradient_udeg_per_s.max(1) as i64;
        div_round(span_x10 as i64 * 100_000, gradient)
    }

    /// Sensor target (0.1°C) for a step of a program
    pub fn target_x10(&self, step: StepId, program: ProgramId) -> i16 {
        self.sensor_targets.resolve(target_temperature(step, program))
    }
}

/// Thermo-stop model evaluated at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThermoEstimate {
    /// Seconds from start temperature to target
    pub total_s: i64,
    /// Seconds from start temperature to the current reading
    pub elapsed_s: i64,
    /// Seconds from the current reading to target
    pub left_s: i64,
}

impl ThermoEstimate {
    pub fn new(calibration: &Calibration, target_x10: i16, start_x10: i16, current_x10: i16) -> Self {
        Self {
            total_s: calibration.heating_secs(target_x10 as i32 - start_x10 as i32),
            elapsed_s: calibration.heating_secs(current_x10 as i32 - start_x10 as i32),
            left_s: calibration.heating_secs(target_x10 as i32 - current_x10 as i32),
        }
    }
}

/// Integer division rounding half away from zero
fn div_round(num: i64, den: i64) -> i64 {
    let half = den / 2;
    if (num < 0) != (den < 0) {
        (num - half) / den
    } else {
        (num + half) / den
    }
}

/// Seconds left in the current step
///
/// Thermo-stops use the live temperature; everything else counts down
/// from the nominal duration.
pub fn time_left_step(
    state: &ProgramRunState,
    calibration: &Calibration,
    now: Timestamp,
    temperature_x10: i16,
) -> i64 {
    let step = state.current_step;
    if is_thermo_stop(step) {
        ThermoEstimate::new(
            calibration,
            calibration.target_x10(step, state.selected_program),
            state.thermostop_start_temperature_x10,
            temperature_x10,
        )
        .left_s
    } else {
        nominal_duration_secs(step) as i64 - state.step_elapsed(now)
    }
}

/// Estimated seconds for steps `from` up to (not including) `until`
///
/// Walks the program's branch table without touching any state.
/// Thermo-stops not yet reached start from their assumed baseline
/// temperature; one that needs no heating adds nothing.
pub fn runtime_for_steps(
    program: ProgramId,
    calibration: &Calibration,
    from: StepId,
    until: StepId,
) -> i64 {
    let mut total = 0;
    let mut step = from;
    while step < until {
        total += if is_thermo_stop(step) {
            let span = calibration.target_x10(step, program) as i32
                - assumed_start_temperature_x10(step) as i32;
            calibration.heating_secs(span).max(0)
        } else {
            nominal_duration_secs(step) as i64
        };
        step = next_step(step, program).step;
    }
    total
}

/// Seconds left until the current sequence ends
pub fn time_left_sequence(
    state: &ProgramRunState,
    calibration: &Calibration,
    now: Timestamp,
    temperature_x10: i16,
) -> i64 {
    let mut left = time_left_step(state, calibration, now, temperature_x10);
    if let Some(last) = last_step(state.current_sequence) {
        if state.current_step != last {
            let from = next_step(state.current_step, state.selected_program).step;
            left += runtime_for_steps(state.selected_program, calibration, from, last.saturating_add(1));
        }
    }
    left
}

/// Seconds left until the program ends
pub fn time_left_program(
    state: &ProgramRunState,
    calibration: &Calibration,
    now: Timestamp,
    temperature_x10: i16,
) -> i64 {
    let mut left = time_left_step(state, calibration, now, temperature_x10);
    if state.current_step < ESTIMATE_HORIZON {
        let from = next_step(state.current_step, state.selected_program).step;
        left += runtime_for_steps(state.selected_program, calibration, from, ESTIMATE_HORIZON);
    }
    left
}
