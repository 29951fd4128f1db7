//! Step table
//!
//! Calibration data describing every operational step of the program cam:
//! nominal duration, thermo-stop flag, per-program target temperature and
//! per-program branch overrides. Lookups are total; unknown ids fall back
//! to zero so a corrupt selector reading never stops the control loop.

use core::ops::RangeInclusive;

use crate::{ProgramId, SequenceId, StepId};

/// Highest step id on the cam
pub const MAX_STEP: StepId = 60;

/// Last step that still belongs to a running program; advancing past it ends the run
pub const TERMINAL_STEP: StepId = 56;

/// Forward estimates stop before this step (the last controlled step)
pub const ESTIMATE_HORIZON: StepId = 57;

/// Steps during which the cam holds while water heats
pub const THERMO_STOP_STEPS: [StepId; 4] = [7, 19, 38, 40];

const FOUR_MINUTES: [StepId; 9] = [6, 12, 13, 20, 21, 51, 53, 58, 59];
const ONE_MINUTE: [StepId; 14] = [4, 10, 11, 16, 17, 22, 23, 28, 33, 36, 37, 50, 56, 57];

/// Nominal step duration in seconds
///
/// Unknown ids (0, > 60) have no duration.
pub fn nominal_duration_secs(step: StepId) -> u16 {
    match step {
        1..=MAX_STEP => {
            if FOUR_MINUTES.contains(&step) {
                240
            } else if ONE_MINUTE.contains(&step) {
                60
            } else {
                30
            }
        }
        _ => 0,
    }
}

/// Nominal step duration in minutes (0.5, 1 or 4)
pub fn nominal_duration_minutes(step: StepId) -> f32 {
    nominal_duration_secs(step) as f32 / 60.0
}

/// True while the cam holds for heating
pub fn is_thermo_stop(step: StepId) -> bool {
    THERMO_STOP_STEPS.contains(&step)
}

/// Nominal target temperature (°C) of a step, 0 if the step does not heat
pub fn target_temperature(step: StepId, program: ProgramId) -> u8 {
    match step {
        1..=8 if program == 3 => 66,
        15..=24 => match program {
            3 | 4 | 6 | 8 => 66,
            5 | 7 | 9 => 56,
            10 | 11 => 45,
            _ => 0,
        },
        35..=38 if (3..=11).contains(&program) => 45,
        39..=45 => match program {
            3..=8 => 66,
            9..=11 => 56,
            _ => 0,
        },
        _ => 0,
    }
}

/// Water temperature (0.1°C) assumed at the start of a thermo-stop that
/// has not been reached yet
///
/// Observed baselines on the calibrated unit.
pub fn assumed_start_temperature_x10(step: StepId) -> i16 {
    match step {
        38 => 250,
        40 => 350,
        _ => 170,
    }
}

/// A per-program branch in the cam sequence
#[derive(Debug, Clone)]
pub struct StepOverride {
    /// Programs this branch applies to
    pub programs: &'static [ProgramId],
    /// Steps it applies to
    pub steps: RangeInclusive<StepId>,
    /// Step the cam lands on
    pub next: StepId,
    /// Sequence the run jumps to, if the branch skips whole sequences
    pub sequence: Option<SequenceId>,
}

/// Branch overrides
///
/// First match wins; no two entries match the same (program, step).
pub static STEP_OVERRIDES: [StepOverride; 9] = [
    StepOverride { programs: &[4, 5], steps: 6..=6, next: 8, sequence: None },
    StepOverride { programs: &[6, 7, 11, 12], steps: 2..=8, next: 9, sequence: Some(2) },
    StepOverride { programs: &[8, 9, 10], steps: 2..=14, next: 15, sequence: Some(3) },
    StepOverride { programs: &[10], steps: 19..=19, next: 24, sequence: None },
    StepOverride { programs: &[10], steps: 28..=28, next: 34, sequence: None },
    StepOverride { programs: &[10], steps: 40..=40, next: 44, sequence: None },
    StepOverride { programs: &[10], steps: 47..=47, next: 56, sequence: None },
    StepOverride { programs: &[12], steps: 14..=55, next: 56, sequence: Some(6) },
    StepOverride { programs: &[12], steps: 56..=59, next: 60, sequence: Some(7) },
];

/// Result of a next-step lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NextStep {
    pub step: StepId,
    /// Sequence to switch to before entering `step`
    pub sequence: Option<SequenceId>,
}

/// Override matching `step` for `program`, if any
pub fn step_override(step: StepId, program: ProgramId) -> Option<&'static StepOverride> {
    STEP_OVERRIDES
        .iter()
        .find(|o| o.programs.contains(&program) && o.steps.contains(&step))
}

/// Step following `step` in `program`
///
/// Pure lookup; applying the sequence change is up to the caller, so this
/// doubles as the non-mutating lookahead used by the time estimates.
pub fn next_step(step: StepId, program: ProgramId) -> NextStep {
    match step_override(step, program) {
        Some(o) => NextStep {
            step: o.next,
            sequence: o.sequence,
        },
        None => NextStep {
            step: step.saturating_add(1),
            sequence: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_duration_table() {
        for step in 1..=59 {
            let expected = if FOUR_MINUTES.contains(&step) {
                4.0
            } else if ONE_MINUTE.contains(&step) {
                1.0
            } else {
                0.5
            };
            assert_eq!(nominal_duration_minutes(step), expected, "step {}", step);
        }
        assert_eq!(nominal_duration_secs(60), 30);
        assert_eq!(nominal_duration_secs(0), 0);
        assert_eq!(nominal_duration_secs(61), 0);
    }

    #[test]
    fn test_duration_spot_checks() {
        assert_eq!(nominal_duration_secs(6), 240);
        assert_eq!(nominal_duration_secs(4), 60);
        assert_eq!(nominal_duration_secs(5), 30);
        assert_eq!(nominal_duration_secs(57), 60);
    }

    #[test]
    fn test_thermo_stop_steps() {
        for step in 0..=61 {
            let expected = matches!(step, 7 | 19 | 38 | 40);
            assert_eq!(is_thermo_stop(step), expected, "step {}", step);
        }
    }

    #[test]
    fn test_intensive_prewash_heats() {
        assert_eq!(target_temperature(7, 3), 66);
        assert!(is_thermo_stop(7));
        assert_eq!(target_temperature(7, 4), 0);
    }

    #[test]
    fn test_target_temperature_groups() {
        assert_eq!(target_temperature(19, 4), 66);
        assert_eq!(target_temperature(19, 7), 56);
        assert_eq!(target_temperature(19, 11), 45);
        assert_eq!(target_temperature(19, 12), 0);
        assert_eq!(target_temperature(38, 3), 45);
        assert_eq!(target_temperature(38, 12), 0);
        assert_eq!(target_temperature(39, 3), 66);
        assert_eq!(target_temperature(40, 10), 56);
        assert_eq!(target_temperature(46, 3), 0);
        assert_eq!(target_temperature(30, 3), 0);
    }

    #[test]
    fn test_short_program_skips_rinse() {
        let next = next_step(19, 10);
        assert_eq!(next.step, 24);
        assert_eq!(next.sequence, None);
    }

    #[test]
    fn test_cold_program_jumps_to_drying() {
        let next = next_step(20, 12);
        assert_eq!(next.step, 56);
        assert_eq!(next.sequence, Some(6));

        let next = next_step(57, 12);
        assert_eq!(next.step, 60);
        assert_eq!(next.sequence, Some(7));
    }

    #[test]
    fn test_default_is_successor() {
        assert_eq!(next_step(19, 3), NextStep { step: 20, sequence: None });
        assert_eq!(next_step(1, 12), NextStep { step: 2, sequence: None });
    }

    #[test]
    fn test_overrides_never_conflict() {
        for program in 1..=12 {
            for step in 1..=MAX_STEP {
                let matches = STEP_OVERRIDES
                    .iter()
                    .filter(|o| o.programs.contains(&program) && o.steps.contains(&step))
                    .count();
                assert!(matches <= 1, "program {} step {}", program, step);
            }
        }
    }

    proptest! {
        #[test]
        fn next_step_always_moves_forward(step in 1u8..=MAX_STEP, program in 0u8..=13) {
            prop_assert!(next_step(step, program).step > step);
        }

        #[test]
        fn unknown_programs_never_branch(step in 1u8..=MAX_STEP, program in 13u8..=255) {
            prop_assert_eq!(next_step(step, program).step, step + 1);
            prop_assert_eq!(target_temperature(step, program), 0);
        }
    }
}
