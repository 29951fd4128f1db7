//! Step transition signal
//!
//! The cam step contact fires an edge interrupt. The handler must not
//! touch run state or do I/O, so it only raises a single-slot flag; the
//! control loop takes it once per tick.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::steps::TERMINAL_STEP;
use crate::StepId;

/// Single-slot, clear-on-read transition flag
#[derive(Debug, Default)]
pub struct TransitionSignal {
    raised: AtomicBool,
}

impl TransitionSignal {
    /// Create a lowered signal
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Raise the flag (interrupt context)
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Atomically read and clear the flag
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Peek without clearing
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Decides whether a control tick should advance the program
///
/// A cam contact bounces, so the flag can be raised on several
/// consecutive ticks for one physical step. Only the first tick of a
/// burst advances. From [`TERMINAL_STEP`] on the cam has no contact and
/// the step times out instead.
#[derive(Debug, Clone, Default)]
pub struct TransitionGate {
    /// Consecutive signalled ticks
    burst: u32,
}

impl TransitionGate {
    pub const fn new() -> Self {
        Self { burst: 0 }
    }

    /// Evaluate one tick
    ///
    /// # Arguments
    /// - `signalled`: value taken from the [`TransitionSignal`] this tick
    /// - `step`: current step
    /// - `time_left_step_s`: estimated seconds left in the current step
    pub fn should_advance(&mut self, signalled: bool, step: StepId, time_left_step_s: i64) -> bool {
        if signalled {
            let first = self.burst == 0;
            self.burst = self.burst.saturating_add(1);
            first
        } else {
            self.burst = 0;
            step >= TERMINAL_STEP && time_left_step_s < 0
        }
    }
}
