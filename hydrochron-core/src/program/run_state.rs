//! Where the machine currently is in its cycle

use crate::catalog::sequence_of;
use crate::{ProgramId, SequenceId, StepId, Timestamp};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mutable record of the current run
///
/// `Copy` so readers on other tasks can take a consistent point-in-time
/// snapshot without holding a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgramRunState {
    /// Program chosen on the selector
    pub selected_program: ProgramId,
    /// Current operational step (1..=60)
    pub current_step: StepId,
    /// Sequence containing `current_step`
    pub current_sequence: SequenceId,
    /// When the current step was entered
    pub step_start_time: Timestamp,
    /// Water temperature (0.1°C) captured when the current thermo-stop began
    pub thermostop_start_temperature_x10: i16,
    /// Set once the program is started
    pub run_start_time: Option<Timestamp>,
    /// Set once the program passes its terminal step
    pub run_end_time: Option<Timestamp>,
    /// Program time-left estimate taken at start (seconds)
    pub estimated_runtime_s: i64,
}

impl ProgramRunState {
    /// Fresh state at process start
    pub const fn new(now: Timestamp) -> Self {
        Self {
            selected_program: 1,
            current_step: 1,
            current_sequence: 1,
            step_start_time: now,
            thermostop_start_temperature_x10: 0,
            run_start_time: None,
            run_end_time: None,
            estimated_runtime_s: 0,
        }
    }

    /// Program started and not yet finished
    pub fn in_program(&self) -> bool {
        self.run_start_time.is_some() && self.run_end_time.is_none()
    }

    /// Program has passed its terminal step
    pub fn is_finished(&self) -> bool {
        self.run_end_time.is_some()
    }

    /// Seconds spent in the current step
    pub fn step_elapsed(&self, now: Timestamp) -> i64 {
        now as i64 - self.step_start_time as i64
    }

    /// Seconds since the run started, frozen once it ends
    pub fn runtime(&self, now: Timestamp) -> i64 {
        match self.run_start_time {
            Some(start) => self.run_end_time.unwrap_or(now) as i64 - start as i64,
            None => 0,
        }
    }

    /// Check the step/sequence invariant
    pub fn sequence_consistent(&self) -> bool {
        sequence_of(self.current_step) == self.current_sequence
    }
}
