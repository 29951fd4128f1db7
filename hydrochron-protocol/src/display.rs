//! Front panel serial display frame

use core::fmt::Write;

use heapless::String;
use hydrochron_hal::ActuatorState;

/// Longest frame we ever build (negative countdowns widen the fields)
pub const MAX_FRAME_LEN: usize = 48;

/// Frame shown whenever no program is actively running
pub const IDLE_FRAME: &str = "ETE0000PR111T00M0U0E0A0H0X";

/// A formatted display frame
pub type DisplayFrame = String<MAX_FRAME_LEN>;

/// Frame formatting errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Formatted frame did not fit in the buffer
    Overflow,
}

/// Build the frame for an active run
///
/// # Arguments
/// - `time_left_program_s`: estimated seconds until the program ends (may be negative)
/// - `progress_percent`: 0..=100
/// - `temperature_c`: whole degrees Celsius
/// - `actuators`: actuator feedback lines
pub fn run_frame(
    time_left_program_s: i64,
    progress_percent: u8,
    temperature_c: i16,
    actuators: &ActuatorState,
) -> Result<DisplayFrame, FrameError> {
    let mut frame = DisplayFrame::new();
    write!(
        frame,
        "ETE{:04}PR{:03}T{:02}M0U{}E{}A{}H{}X",
        time_left_program_s,
        progress_percent,
        temperature_c,
        u8::from(actuators.pump_circulation),
        u8::from(actuators.valve_inlet),
        u8::from(actuators.valve_outlet),
        u8::from(actuators.heating),
    )
    .map_err(|_| FrameError::Overflow)?;
    Ok(frame)
}

const _: () = assert!(IDLE_FRAME.len() <= MAX_FRAME_LEN);

/// Build the frame shown outside an active run
pub fn idle_frame() -> DisplayFrame {
    let mut frame = DisplayFrame::new();
    // Cannot fail, see the length assertion below
    let _ = frame.push_str(IDLE_FRAME);
    frame
}
