//! Point-in-time telemetry snapshots
//!
//! A [`TelemetrySnapshot`] is built once per collector tick from a copy of
//! the [`ProgramRunState`], the live sensor sample and the energy meter
//! reading. Every sink gets the same snapshot.

use hydrochron_hal::ActuatorState;
use hydrochron_protocol::{idle_frame, run_frame, DisplayFrame, FrameError, RunState};

use crate::program::{estimate, Calibration, ProgramRunState};
use crate::report::{ReportStage, ReportStageMachine};
use crate::{ProgramId, SequenceId, StepId, Timestamp};

/// Live appliance readings taken for one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSample {
    /// Water temperature in 0.1°C
    pub temperature_x10: i16,
    pub actuators: ActuatorState,
}

/// Energy meter figures for the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnergyReading {
    /// Watt-hours consumed since process start, 0 without a meter
    pub consumed_wh: i64,
    /// Instantaneous power draw in watts
    pub power_w: Option<i64>,
}

/// Completion percentage
///
/// 100 once the run has ended; otherwise the share of elapsed runtime in
/// the projected total, clamped to 0..=100.
pub fn progress_percent(runtime_s: i64, time_left_s: i64, ended: bool) -> u8 {
    let total = runtime_s + time_left_s;
    if total == 0 {
        0
    } else if ended {
        100
    } else {
        (runtime_s * 100 / total).clamp(0, 100) as u8
    }
}

/// Immutable telemetry record for one collector tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySnapshot {
    pub stage: ReportStage,
    pub program: ProgramId,
    pub step: StepId,
    pub sequence: SequenceId,
    pub runtime_s: i64,
    pub progress_percent: u8,
    pub estimated_runtime_s: i64,
    pub time_start: Timestamp,
    pub time_end: Option<Timestamp>,
    pub time_left_step_s: i64,
    pub time_left_sequence_s: i64,
    pub time_left_program_s: i64,
    pub temperature_x10: i16,
    pub actuators: ActuatorState,
    pub energy: EnergyReading,
}

impl TelemetrySnapshot {
    /// Build a snapshot for the current stage
    ///
    /// Returns `None` in stages that do not sample the appliance, or if
    /// the run has not started.
    pub fn capture(
        stages: &ReportStageMachine,
        state: &ProgramRunState,
        calibration: &Calibration,
        now: Timestamp,
        sample: SensorSample,
        energy: EnergyReading,
    ) -> Option<Self> {
        let stage = stages.stage();
        if !stage.samples_machine() {
            return None;
        }
        let time_start = state.run_start_time?;
        let runtime_s = state.runtime(now);

        let (time_left_step_s, time_left_sequence_s, time_left_program_s) =
            match (stage, state.run_end_time) {
                (ReportStage::Draining, Some(end)) => {
                    let left = stages.afterrunning_left(end, now);
                    (left, left, 0)
                }
                _ => {
                    let t = sample.temperature_x10;
                    (
                        estimate::time_left_step(state, calibration, now, t),
                        estimate::time_left_sequence(state, calibration, now, t),
                        estimate::time_left_program(state, calibration, now, t),
                    )
                }
            };

        Some(Self {
            stage,
            program: state.selected_program,
            step: state.current_step,
            sequence: state.current_sequence,
            runtime_s,
            progress_percent: progress_percent(
                runtime_s,
                time_left_program_s,
                state.run_end_time.is_some(),
            ),
            estimated_runtime_s: state.estimated_runtime_s,
            time_start,
            time_end: state.run_end_time,
            time_left_step_s,
            time_left_sequence_s,
            time_left_program_s,
            temperature_x10: sample.temperature_x10,
            actuators: sample.actuators,
            energy,
        })
    }

    /// Water temperature in °C
    pub fn temperature_c(&self) -> f32 {
        f32::from(self.temperature_x10) / 10.0
    }

    /// Backend run-state body
    pub fn run_state_message<'a>(&self, session_id: u64, device_identifier: &'a str) -> RunState<'a> {
        RunState {
            session_id,
            device_identifier,
            program_runtime: self.runtime_s,
            program_progress_percent: self.progress_percent,
            program_step_operational: self.step,
            program_step_sequence: self.sequence,
            program_selected_id: self.program,
            program_estimated_runtime: self.estimated_runtime_s,
            program_time_start: self.time_start,
            program_time_end: self.time_end,
            program_time_left_step: self.time_left_step_s,
            program_time_left_sequence: self.time_left_sequence_s,
            program_time_left_program: self.time_left_program_s,
            machine_temperature: self.temperature_c(),
            machine_sensor_values: self.actuators.into(),
            machine_aenergy: self.energy.consumed_wh,
            machine_apower: self.energy.power_w,
        }
    }

    /// Front panel frame
    ///
    /// The run frame until the run ends, the idle frame afterwards.
    pub fn display_frame(&self) -> Result<DisplayFrame, FrameError> {
        if self.time_end.is_some() {
            return Ok(idle_frame());
        }
        run_frame(
            self.time_left_program_s,
            self.progress_percent,
            self.temperature_x10 / 10,
            &self.actuators,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramStateMachine;
    use hydrochron_protocol::IDLE_FRAME;

    const AFTERRUNNING: u64 = 1800;

    fn sample(temperature_x10: i16) -> SensorSample {
        SensorSample {
            temperature_x10,
            actuators: ActuatorState {
                pump_circulation: true,
                heating: true,
                ..Default::default()
            },
        }
    }

    fn started() -> ProgramStateMachine {
        let mut machine = ProgramStateMachine::new(Calibration::default(), 0);
        machine.select_program(3);
        machine.start(1000, 200);
        machine
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0, false), 0);
        assert_eq!(progress_percent(0, 0, true), 0);
        assert_eq!(progress_percent(300, 2700, false), 10);
        assert_eq!(progress_percent(3000, 500, true), 100);
        // Overshoot past the estimate
        assert_eq!(progress_percent(3000, -500, false), 100);
        assert_eq!(progress_percent(3000, -4000, false), 0);
    }

    #[test]
    fn test_no_snapshot_when_idle() {
        let machine = ProgramStateMachine::new(Calibration::default(), 0);
        let stages = ReportStageMachine::new(AFTERRUNNING);
        let snapshot = TelemetrySnapshot::capture(
            &stages,
            machine.state(),
            machine.calibration(),
            10,
            sample(200),
            EnergyReading::default(),
        );
        assert!(snapshot.is_none());
    }

    #[test]
    fn test_active_snapshot_uses_estimates() {
        let machine = started();
        let mut stages = ReportStageMachine::new(AFTERRUNNING);
        let state = machine.snapshot();
        let now = 1060;
        stages.update(state.run_start_time, state.run_end_time, now);

        let snapshot = TelemetrySnapshot::capture(
            &stages,
            &state,
            machine.calibration(),
            now,
            sample(200),
            EnergyReading {
                consumed_wh: 12,
                power_w: Some(2100),
            },
        )
        .unwrap();

        assert_eq!(snapshot.stage, ReportStage::Active);
        assert_eq!(snapshot.runtime_s, 60);
        assert_eq!(snapshot.step, 1);
        assert_eq!(snapshot.time_left_step_s, machine.time_left_step(now, 200));
        assert_eq!(snapshot.time_left_program_s, machine.time_left_program(now, 200));
        assert!(snapshot.progress_percent < 100);
        assert_eq!(snapshot.energy.consumed_wh, 12);

        let msg = snapshot.run_state_message(7, "dev");
        assert_eq!(msg.session_id, 7);
        assert_eq!(msg.program_selected_id, 3);
        assert_eq!(msg.program_time_start, 1000);
        assert_eq!(msg.program_time_end, None);
        assert_eq!(msg.machine_temperature, 20.0);
        assert_eq!(msg.machine_apower, Some(2100));
        assert!(msg.machine_sensor_values.heating);

        let frame = snapshot.display_frame().unwrap();
        assert!(frame.starts_with("ETE"));
        assert!(frame.ends_with("T20M0U1E0A0H1X"));
    }

    #[test]
    fn test_draining_snapshot_counts_down_afterrunning() {
        let mut machine = started();
        while !machine.state().is_finished() {
            let now = machine.state().step_start_time + 10;
            machine.advance(None, now, 200);
        }
        let state = machine.snapshot();
        let end = state.run_end_time.unwrap();
        let mut stages = ReportStageMachine::new(AFTERRUNNING);
        stages.update(state.run_start_time, state.run_end_time, end);
        assert_eq!(stages.stage(), ReportStage::Active);
        stages.update(state.run_start_time, state.run_end_time, end + 5);
        assert_eq!(stages.stage(), ReportStage::Draining);

        let snapshot = TelemetrySnapshot::capture(
            &stages,
            &state,
            machine.calibration(),
            end + 5,
            sample(400),
            EnergyReading::default(),
        )
        .unwrap();

        assert_eq!(snapshot.time_left_step_s, 1795);
        assert_eq!(snapshot.time_left_sequence_s, 1795);
        assert_eq!(snapshot.time_left_program_s, 0);
        assert_eq!(snapshot.progress_percent, 100);
        // Runtime is frozen at the end time
        assert_eq!(snapshot.runtime_s, (end - 1000) as i64);
        assert_eq!(snapshot.display_frame().unwrap().as_str(), IDLE_FRAME);
    }
}
