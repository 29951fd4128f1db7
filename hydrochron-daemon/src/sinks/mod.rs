//! Telemetry sinks
//!
//! Each sink gets the same snapshot and fails on its own; nothing a sink
//! returns stops the others.

pub mod backend;
pub mod display;

pub use backend::{BackendClient, LinkEdge, LinkHealth};
pub use display::SerialDisplay;

/// The sinks a collector dispatches to
#[derive(Default)]
pub struct Sinks {
    pub backend: Option<BackendClient>,
    pub display: Option<SerialDisplay>,
}
