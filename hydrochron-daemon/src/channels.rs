//! Inter-task channels
//!
//! The supervisor publishes the run state through a watch channel; readers
//! always get a whole `ProgramRunState` copy, never a half-applied update.

use hydrochron_core::program::ProgramRunState;
use hydrochron_core::report::ReportStage;
use hydrochron_core::telemetry::EnergyReading;
use tokio::sync::watch;

/// Capacity of the recorder queue
pub const RECORD_QUEUE_DEPTH: usize = 64;

/// Supervisor side of the run state channel
pub type RunStateTx = watch::Sender<ProgramRunState>;

/// Reader side of the run state channel
pub type RunStateRx = watch::Receiver<ProgramRunState>;

/// What the collector last reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorStatus {
    pub stage: ReportStage,
    pub energy: EnergyReading,
}

impl Default for CollectorStatus {
    fn default() -> Self {
        Self {
            stage: ReportStage::Idle,
            energy: EnergyReading::default(),
        }
    }
}

/// Create the run state channel
pub fn run_state_channel(initial: ProgramRunState) -> (RunStateTx, RunStateRx) {
    watch::channel(initial)
}
