//! Program selector decoding
//!
//! With the selector relays energised, the knob position shows up as a
//! pattern on seven sense lines. The decision tree below was worked out
//! against the physical switch.

use hydrochron_hal::SelectorState;

use crate::catalog::{PROGRAM_DEFAULT, PROGRAM_STOP_START};
use crate::ProgramId;

/// Decode the selected program from the selector sense lines
///
/// Returns [`PROGRAM_STOP_START`] while the knob rests on "Stop - Start";
/// callers treat that as "nothing selected yet". Patterns that match no
/// branch resolve to [`PROGRAM_DEFAULT`].
pub fn identify_program(lines: &SelectorState) -> ProgramId {
    if lines.p4 {
        return if lines.p9 {
            10
        } else if lines.p12 {
            9
        } else {
            11
        };
    }
    if lines.p11 {
        return if lines.p12 { PROGRAM_STOP_START } else { 12 };
    }
    if lines.p6 {
        return if lines.p7 { 5 } else { 7 };
    }
    if lines.p7 {
        return 4;
    }
    if lines.p10 {
        return if lines.p12 { 8 } else { 6 };
    }
    PROGRAM_DEFAULT
}
