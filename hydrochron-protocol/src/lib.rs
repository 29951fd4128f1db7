//! Hydrochron wire formats
//!
//! Two consumers sit downstream of the telemetry collector:
//!
//! - A serial display on the front panel that understands a single
//!   fixed-width ASCII frame:
//!   ```text
//!   ETE<time left:4>PR<progress:3>T<temp:2>M0U<circ>E<inlet>A<outlet>H<heat>X
//!   ```
//! - A remote backend receiving JSON "is-alive" and "run-state" records.
//!
//! Both formats are fixed by the consumers; nothing here is negotiable.

#![no_std]
#![deny(unsafe_code)]

pub mod display;
pub mod messages;

pub use display::{idle_frame, run_frame, DisplayFrame, FrameError, IDLE_FRAME, MAX_FRAME_LEN};
pub use messages::{IsAlive, MachineSensorValues, RunState};
