//! Appliance backends
//!
//! - [`linux`]: sysfs GPIO lines and a 1-wire thermometer
//! - [`sim`]: in-memory machine for `--simulate` and tests

pub mod linux;
pub mod sim;

use std::sync::Arc;

use hydrochron_core::signal::TransitionSignal;
use hydrochron_hal::Machine;

/// Machine handle shared by the supervisor and the collector
pub type SharedMachine = Arc<dyn Machine + Send + Sync>;

/// Flag raised by the step contact watcher, taken by the supervisor
pub type SharedSignal = Arc<TransitionSignal>;
