//! Program state machine
//!
//! Owns the [`ProgramRunState`] and is its only mutator. Step advancement
//! is driven from outside (the supervisor loop reacts to the cam contact);
//! the machine applies the step table, keeps the sequence in step with the
//! current step and captures thermo-stop start temperatures.

use crate::catalog::last_step;
use crate::program::desync::{desync_anchor, Desync};
use crate::program::estimate::{self, Calibration};
use crate::program::run_state::ProgramRunState;
use crate::steps::{is_thermo_stop, next_step, TERMINAL_STEP};
use crate::{ProgramId, StepId, Timestamp};

/// Outcome of a step advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepChange {
    pub from: StepId,
    pub to: StepId,
    /// The advance moved the run past its terminal step
    pub finished: bool,
}

/// Program sequencing state machine
#[derive(Debug, Clone)]
pub struct ProgramStateMachine {
    state: ProgramRunState,
    calibration: Calibration,
}

impl ProgramStateMachine {
    /// Create a state machine at process start
    pub fn new(calibration: Calibration, now: Timestamp) -> Self {
        Self {
            state: ProgramRunState::new(now),
            calibration,
        }
    }

    /// Current run state
    pub fn state(&self) -> &ProgramRunState {
        &self.state
    }

    /// Point-in-time copy of the run state
    pub fn snapshot(&self) -> ProgramRunState {
        self.state
    }

    /// Thermal calibration in use
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Record the program read from the selector
    ///
    /// Ignored once a run has started.
    pub fn select_program(&mut self, program: ProgramId) {
        if self.state.run_start_time.is_none() {
            self.state.selected_program = program;
        }
    }

    /// Start the selected program
    ///
    /// Resets to step 1 and records the estimated program duration.
    pub fn start(&mut self, now: Timestamp, temperature_x10: i16) {
        self.state.current_step = 1;
        self.state.current_sequence = 1;
        self.state.step_start_time = now;
        self.state.run_start_time = Some(now);
        self.state.run_end_time = None;
        self.state.estimated_runtime_s = self.time_left_program(now, temperature_x10);
    }

    /// Step the cam would move to next, without changing anything
    pub fn lookahead_next_step(&self) -> StepId {
        next_step(self.state.current_step, self.state.selected_program).step
    }

    /// Advance to the next step, or to `explicit` if given
    ///
    /// Branch overrides may jump the sequence before the new step is
    /// entered. Entering a step past the sequence's last step moves to the
    /// next sequence; entering a thermo-stop captures `temperature_x10` as
    /// its start temperature; entering a step past [`TERMINAL_STEP`] ends
    /// the run.
    pub fn advance(
        &mut self,
        explicit: Option<StepId>,
        now: Timestamp,
        temperature_x10: i16,
    ) -> StepChange {
        let from = self.state.current_step;
        let was_finished = self.state.is_finished();
        let to = match explicit {
            Some(step) => step,
            None => {
                let next = next_step(from, self.state.selected_program);
                if let Some(sequence) = next.sequence {
                    self.state.current_sequence = sequence;
                }
                next.step
            }
        };
        self.enter_step(to, now, temperature_x10);

        StepChange {
            from,
            to,
            finished: !was_finished && self.state.is_finished(),
        }
    }

    fn enter_step(&mut self, step: StepId, now: Timestamp, temperature_x10: i16) {
        self.state.current_step = step;
        self.state.step_start_time = now;

        if let Some(last) = last_step(self.state.current_sequence) {
            if step > last {
                self.state.current_sequence += 1;
            }
        }

        if is_thermo_stop(step) {
            self.state.thermostop_start_temperature_x10 = temperature_x10;
        }

        if step > TERMINAL_STEP && self.state.run_end_time.is_none() {
            self.state.run_end_time = Some(now);
        }
    }

    /// Re-anchor the program on the drain outlet cue
    ///
    /// Returns the correction applied, if any.
    pub fn check_sync(
        &mut self,
        drain_active: bool,
        now: Timestamp,
        temperature_x10: i16,
    ) -> Option<Desync> {
        if !drain_active {
            return None;
        }
        let from = self.state.current_step;
        let to = desync_anchor(from)?;
        self.advance(Some(to), now, temperature_x10);
        Some(Desync { from, to })
    }

    /// Seconds left in the current step
    pub fn time_left_step(&self, now: Timestamp, temperature_x10: i16) -> i64 {
        estimate::time_left_step(&self.state, &self.calibration, now, temperature_x10)
    }

    /// Seconds left in the current sequence
    pub fn time_left_sequence(&self, now: Timestamp, temperature_x10: i16) -> i64 {
        estimate::time_left_sequence(&self.state, &self.calibration, now, temperature_x10)
    }

    /// Seconds left in the program
    pub fn time_left_program(&self, now: Timestamp, temperature_x10: i16) -> i64 {
        estimate::time_left_program(&self.state, &self.calibration, now, temperature_x10)
    }
}
