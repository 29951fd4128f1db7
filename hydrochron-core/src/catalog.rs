//! Program and sequence catalogs
//!
//! Fixed for the appliance this controller was calibrated against.

use crate::{ProgramId, SequenceId, StepId};

/// Program the selector reports when the knob sits on "Stop - Start"
pub const PROGRAM_STOP_START: ProgramId = 2;

/// Program assumed when the selector lines are ambiguous
pub const PROGRAM_DEFAULT: ProgramId = 3;

/// Sequence used for the idle/stop state
pub const SEQUENCE_IDLE: SequenceId = 0;

/// Name returned for unknown ids
pub const INVALID_NAME: &str = "Invalid";

const PROGRAM_NAMES: [&str; 12] = [
    "VDE - 0",
    "Stop - Start",
    "Intensiv 65°C",
    "Universal Plus 65°C",
    "Universal Plus 55°C",
    "Universal 65°C",
    "Universal 55°C",
    "Spar 65°C",
    "Spar 55°C",
    "Kurz 45°C",
    "Fein 45°C",
    "Kalt",
];

/// Sequence catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sequence {
    pub id: SequenceId,
    pub name: &'static str,
    /// Highest step belonging to this sequence (None = unbounded)
    pub last_step: Option<StepId>,
    /// Nominal number of steps
    pub step_count: u8,
}

/// All sequences, ordered by id
pub const SEQUENCES: [Sequence; 8] = [
    Sequence { id: 0, name: "Stop - Start", last_step: None, step_count: 0 },
    Sequence { id: 1, name: "1. Vorspülen", last_step: Some(8), step_count: 8 },
    Sequence { id: 2, name: "2. Vorspülen", last_step: Some(14), step_count: 6 },
    Sequence { id: 3, name: "Reinigen", last_step: Some(24), step_count: 10 },
    Sequence { id: 4, name: "Zwischenspülen", last_step: Some(34), step_count: 10 },
    Sequence { id: 5, name: "Klarspülen", last_step: Some(45), step_count: 11 },
    Sequence { id: 6, name: "Trocknen", last_step: Some(56), step_count: 11 },
    Sequence { id: 7, name: "Auslaufen", last_step: Some(60), step_count: 4 },
];

/// Display name of a program
pub fn program_name(program: ProgramId) -> &'static str {
    match program {
        1..=12 => PROGRAM_NAMES[program as usize - 1],
        _ => INVALID_NAME,
    }
}

/// Look up a sequence by id
pub fn sequence(id: SequenceId) -> Option<&'static Sequence> {
    SEQUENCES.get(id as usize)
}

/// Display name of a sequence
pub fn sequence_name(id: SequenceId) -> &'static str {
    sequence(id).map_or(INVALID_NAME, |s| s.name)
}

/// Highest step of a sequence
///
/// Sequence 0 (idle) and unknown ids have no upper bound.
pub fn last_step(id: SequenceId) -> Option<StepId> {
    sequence(id).and_then(|s| s.last_step)
}

/// Sequence whose step range contains `step`
pub fn sequence_of(step: StepId) -> SequenceId {
    SEQUENCES
        .iter()
        .filter_map(|s| s.last_step.map(|last| (s.id, last)))
        .find(|&(_, last)| step <= last)
        .map_or(SEQUENCE_IDLE, |(id, _)| id)
}
