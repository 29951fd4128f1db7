//! Hydrochron Hardware Abstraction Layer
//!
//! This crate defines the contract between the program sequencer and the
//! physical appliance. Pin setup, edge interrupts and sensor drivers live
//! in the implementations; the sequencer only sees typed lines.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (hydrochron-daemon)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  hydrochron-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ linux sysfs / │       │   simulated   │
//! │   1-wire      │       │    machine    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`machine::Machine`] - sensor reads and relay outputs

#![no_std]
#![deny(unsafe_code)]

pub mod lines;
pub mod machine;

pub use lines::{ActuatorState, InputLine, OutputLine, SelectorState};
pub use machine::Machine;
