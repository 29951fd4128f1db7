//! Board-agnostic core logic for the dishwasher controller
//!
//! This crate contains all sequencing logic that does not depend on
//! specific hardware or transports:
//!
//! - Step table (calibration data for one Miele G 470)
//! - Program and sequence catalogs
//! - Program state machine with thermo-stop time estimation
//! - Desynchronization recovery
//! - Program selector decoding
//! - Step transition signal
//! - Telemetry report stages and snapshots
//!
//! Time is passed in explicitly as unix seconds and temperatures as
//! 0.1°C fixed point, so everything here is deterministic and host-testable.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod catalog;
pub mod program;
pub mod report;
pub mod selector;
pub mod signal;
pub mod steps;
pub mod telemetry;

/// Program identifier (1..=12)
pub type ProgramId = u8;

/// Operational step identifier (1..=60)
pub type StepId = u8;

/// Sequence identifier (0..=7)
pub type SequenceId = u8;

/// Unix time in whole seconds
pub type Timestamp = u64;
