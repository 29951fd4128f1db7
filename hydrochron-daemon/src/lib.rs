//! Hydrochron host daemon
//!
//! Wires the board-agnostic sequencer from `hydrochron-core` to the real
//! appliance (or a simulated one) and runs two tasks side by side:
//!
//! - the supervisor, a 1 Hz control loop and sole owner of the program state
//! - the telemetry collector, which samples that state on its own schedule
//!   and fans snapshots out to the backend, the serial display and the logs

pub mod channels;
pub mod clock;
pub mod config;
pub mod energy;
pub mod error;
pub mod hardware;
pub mod recorder;
pub mod sinks;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
