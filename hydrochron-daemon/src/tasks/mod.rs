//! Long-running daemon tasks
//!
//! - [`supervisor`]: 1 Hz control loop, startup and shutdown of a run
//! - [`telemetry`]: background collector feeding the sinks

pub mod supervisor;
pub mod telemetry;

pub use supervisor::{Supervisor, SupervisorSettings};
pub use telemetry::{CollectorSettings, CollectorStopper, TelemetryCollector};
