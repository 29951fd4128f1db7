//! Desynchronization recovery
//!
//! A missed cam contact leaves the believed step behind the physical one.
//! The drain outlet only opens at known points of the cycle, so seeing it
//! active inside one of these windows pins the cam to the window's anchor.

use core::ops::RangeInclusive;

use crate::StepId;

/// Step windows and the step the cam must be on when the drain is active
///
/// Tuned on the physical unit; keep verbatim.
pub static DESYNC_ANCHORS: [(RangeInclusive<StepId>, StepId); 7] = [
    (16..=19, 15),
    (20..=23, 24),
    (26..=29, 25),
    (30..=33, 34),
    (36..=40, 35),
    (41..=43, 44),
    (52..=55, 56),
];

/// A correction applied by the desync check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Desync {
    pub from: StepId,
    pub to: StepId,
}

/// Anchor step for `step` when the drain outlet is active
pub fn desync_anchor(step: StepId) -> Option<StepId> {
    DESYNC_ANCHORS
        .iter()
        .find(|(window, _)| window.contains(&step))
        .map(|&(_, anchor)| anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::MAX_STEP;

    #[test]
    fn test_windows_map_to_anchors() {
        for (window, anchor) in DESYNC_ANCHORS.iter() {
            for step in window.clone() {
                assert_eq!(desync_anchor(step), Some(*anchor), "step {}", step);
            }
        }
    }

    #[test]
    fn test_outside_windows_untouched() {
        for step in 0..=MAX_STEP + 1 {
            let inside = DESYNC_ANCHORS.iter().any(|(w, _)| w.contains(&step));
            if !inside {
                assert_eq!(desync_anchor(step), None, "step {}", step);
            }
        }
        // Anchors themselves are outside every window
        for (_, anchor) in DESYNC_ANCHORS.iter() {
            assert_eq!(desync_anchor(*anchor), None);
        }
    }

    #[test]
    fn test_drain_during_main_wash() {
        assert_eq!(desync_anchor(21), Some(24));
        assert_eq!(desync_anchor(24), None);
        assert_eq!(desync_anchor(14), None);
    }
}
