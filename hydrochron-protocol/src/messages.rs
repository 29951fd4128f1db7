//! Backend message bodies
//!
//! Field names are part of the backend contract and must not change.

use hydrochron_hal::ActuatorState;
use serde::Serialize;

/// Liveness record, sent whenever no run is being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IsAlive<'a> {
    pub session_id: u64,
    pub device_identifier: &'a str,
}

/// Actuator feedback as reported to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MachineSensorValues {
    pub pump_drain: bool,
    pub pump_circulation: bool,
    pub valve_inlet: bool,
    pub valve_outlet: bool,
    pub heating: bool,
}

impl From<ActuatorState> for MachineSensorValues {
    fn from(state: ActuatorState) -> Self {
        Self {
            pump_drain: state.pump_drain,
            pump_circulation: state.pump_circulation,
            valve_inlet: state.valve_inlet,
            valve_outlet: state.valve_outlet,
            heating: state.heating,
        }
    }
}

/// Run progress record, sent while a run is active or draining
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState<'a> {
    pub session_id: u64,
    pub device_identifier: &'a str,
    /// Seconds since the run started
    pub program_runtime: i64,
    pub program_progress_percent: u8,
    pub program_step_operational: u8,
    pub program_step_sequence: u8,
    pub program_selected_id: u8,
    /// Estimated program duration at start (seconds)
    pub program_estimated_runtime: i64,
    /// Unix seconds
    pub program_time_start: u64,
    /// Unix seconds, null while running
    pub program_time_end: Option<u64>,
    pub program_time_left_step: i64,
    pub program_time_left_sequence: i64,
    pub program_time_left_program: i64,
    /// Degrees Celsius, 0.1 resolution
    pub machine_temperature: f32,
    pub machine_sensor_values: MachineSensorValues,
    /// Watt-hours consumed since the process started
    pub machine_aenergy: i64,
    /// Instantaneous power in watts, null if the meter is unavailable
    pub machine_apower: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_alive_shape() {
        let msg = IsAlive {
            session_id: 1_700_000_000,
            device_identifier: "00:00:5e:00:53:af",
        };
        let json = serde_json::to_value(msg).unwrap();
        assert_eq!(json["session_id"], 1_700_000_000u64);
        assert_eq!(json["device_identifier"], "00:00:5e:00:53:af");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_run_state_nullable_fields() {
        let msg = RunState {
            session_id: 1,
            device_identifier: "dev",
            program_runtime: 60,
            program_progress_percent: 2,
            program_step_operational: 3,
            program_step_sequence: 1,
            program_selected_id: 3,
            program_estimated_runtime: 3300,
            program_time_start: 100,
            program_time_end: None,
            program_time_left_step: 10,
            program_time_left_sequence: 200,
            program_time_left_program: 3240,
            machine_temperature: 43.5,
            machine_sensor_values: MachineSensorValues {
                heating: true,
                ..Default::default()
            },
            machine_aenergy: 0,
            machine_apower: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["program_time_end"].is_null());
        assert!(json["machine_apower"].is_null());
        assert_eq!(json["machine_temperature"], 43.5);
        assert_eq!(json["machine_sensor_values"]["heating"], true);
        assert_eq!(json["machine_sensor_values"]["pump_drain"], false);
        assert_eq!(json.as_object().unwrap().len(), 17);
    }
}
