//! Program execution
//!
//! The run state record, the state machine that owns it, the time
//! estimation model and desynchronization recovery.

pub mod desync;
pub mod estimate;
pub mod machine;
pub mod run_state;

pub use desync::{desync_anchor, Desync, DESYNC_ANCHORS};
pub use estimate::{Calibration, SensorTargets, ThermoEstimate};
pub use machine::{ProgramStateMachine, StepChange};
pub use run_state::ProgramRunState;
