//! Telemetry report stages
//!
//! ```text
//! Idle ──start──▶ Active ──end seen, +1 tick──▶ Draining ──window elapsed──▶ Ended
//! ```
//!
//! The extra tick before `Draining` lets the last `Active` snapshot (the
//! one carrying the end time) go out before reporting is downgraded.

use crate::Timestamp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which records the telemetry collector emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReportStage {
    /// No run yet; liveness only
    Idle,
    /// Run in progress; full snapshots
    Active,
    /// Run ended; snapshots with the afterrunning countdown
    Draining,
    /// Afterrunning window over; liveness only
    Ended,
}

impl ReportStage {
    /// Whether this stage samples the appliance
    pub fn samples_machine(self) -> bool {
        matches!(self, ReportStage::Active | ReportStage::Draining)
    }
}

/// Monotonic report stage tracker for one run
#[derive(Debug, Clone)]
pub struct ReportStageMachine {
    stage: ReportStage,
    /// Run end seen on a previous tick while still `Active`
    end_observed: bool,
    /// Afterrunning window in seconds
    afterrunning_s: u64,
}

impl ReportStageMachine {
    pub fn new(afterrunning_s: u64) -> Self {
        Self {
            stage: ReportStage::Idle,
            end_observed: false,
            afterrunning_s,
        }
    }

    /// Current stage
    pub fn stage(&self) -> ReportStage {
        self.stage
    }

    /// Seconds left in the afterrunning window
    ///
    /// Negative once the window has passed.
    pub fn afterrunning_left(&self, run_end: Timestamp, now: Timestamp) -> i64 {
        self.afterrunning_s as i64 - (now as i64 - run_end as i64)
    }

    /// Evaluate one collector tick
    pub fn update(
        &mut self,
        run_start: Option<Timestamp>,
        run_end: Option<Timestamp>,
        now: Timestamp,
    ) -> ReportStage {
        if self.stage == ReportStage::Ended || run_start.is_none() {
            return self.stage;
        }

        if self.stage == ReportStage::Idle {
            self.stage = ReportStage::Active;
        }

        if self.stage == ReportStage::Active && run_end.is_some() {
            if self.end_observed {
                self.stage = ReportStage::Draining;
            } else {
                self.end_observed = true;
            }
        }

        if self.stage == ReportStage::Draining {
            if let Some(end) = run_end {
                if self.afterrunning_left(end, now) < 0 {
                    self.stage = ReportStage::Ended;
                }
            }
        }

        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_until_start() {
        let mut stages = ReportStageMachine::new(60);
        assert_eq!(stages.update(None, None, 10), ReportStage::Idle);
        assert_eq!(stages.update(None, None, 20), ReportStage::Idle);
        assert_eq!(stages.update(Some(25), None, 30), ReportStage::Active);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut stages = ReportStageMachine::new(60);
        assert_eq!(stages.update(Some(0), None, 5), ReportStage::Active);
        assert_eq!(stages.update(Some(0), None, 10), ReportStage::Active);

        // End observed: one more Active tick
        assert_eq!(stages.update(Some(0), Some(12), 15), ReportStage::Active);
        assert_eq!(stages.update(Some(0), Some(12), 20), ReportStage::Draining);
        assert_eq!(stages.afterrunning_left(12, 20), 52);

        assert_eq!(stages.update(Some(0), Some(12), 72), ReportStage::Draining);
        assert_eq!(stages.update(Some(0), Some(12), 73), ReportStage::Ended);
        assert_eq!(stages.update(Some(0), Some(12), 80), ReportStage::Ended);
    }

    #[test]
    fn test_stages_never_go_back() {
        let mut stages = ReportStageMachine::new(0);
        let mut last = ReportStage::Idle;
        let inputs = [
            (None, None, 0),
            (Some(1), None, 2),
            (Some(1), Some(3), 4),
            (Some(1), Some(3), 5),
            (None, None, 6),
            (Some(1), None, 7),
        ];
        for (start, end, now) in inputs {
            let stage = stages.update(start, end, now);
            assert!(stage >= last);
            last = stage;
        }
        assert_eq!(last, ReportStage::Ended);
    }

    #[test]
    fn test_sampling_stages() {
        assert!(!ReportStage::Idle.samples_machine());
        assert!(ReportStage::Active.samples_machine());
        assert!(ReportStage::Draining.samples_machine());
        assert!(!ReportStage::Ended.samples_machine());
    }
}
