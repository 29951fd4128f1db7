//! Named sensor and relay lines
//!
//! The appliance exposes its internal relay states through opto-coupled
//! feedback lines. Every line the sequencer cares about is named here so
//! implementations can map them to pins however they like.

/// Single digital input lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputLine {
    /// Drain pump running
    PumpDrain,
    /// Circulation pump running
    PumpCirculation,
    /// Water inlet valve open
    ValveInlet,
    /// Drain outlet active
    ValveOutlet,
    /// Heating element energised
    Heating,
    /// Program cam back at its zero position
    ZeroPosition,
    /// Program cam step contact (edge-triggered by the implementation)
    StepTransition,
}

impl InputLine {
    /// All lines, in configuration order
    pub const ALL: [InputLine; 7] = [
        InputLine::PumpDrain,
        InputLine::PumpCirculation,
        InputLine::ValveInlet,
        InputLine::ValveOutlet,
        InputLine::Heating,
        InputLine::ZeroPosition,
        InputLine::StepTransition,
    ];

    /// Configuration key for this line
    pub const fn name(self) -> &'static str {
        match self {
            InputLine::PumpDrain => "pump_drain",
            InputLine::PumpCirculation => "pump_circulation",
            InputLine::ValveInlet => "valve_inlet",
            InputLine::ValveOutlet => "valve_outlet",
            InputLine::Heating => "heating",
            InputLine::ZeroPosition => "zero_position",
            InputLine::StepTransition => "step_transition",
        }
    }
}

/// Relay outputs driven by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputLine {
    /// Mains feed to the appliance
    MainRelay,
    /// Program selector probe relays
    SelectorRelays,
    /// Front panel status LED
    Led,
    /// Piezo buzzer
    Buzzer,
}

impl OutputLine {
    /// All lines, in configuration order
    pub const ALL: [OutputLine; 4] = [
        OutputLine::MainRelay,
        OutputLine::SelectorRelays,
        OutputLine::Led,
        OutputLine::Buzzer,
    ];

    /// Configuration key for this line
    pub const fn name(self) -> &'static str {
        match self {
            OutputLine::MainRelay => "main_relay",
            OutputLine::SelectorRelays => "selector_relays",
            OutputLine::Led => "led",
            OutputLine::Buzzer => "buzzer",
        }
    }
}

/// The seven program selector sense lines
///
/// Read while the selector relays are energised. Line names follow the
/// contact numbering printed on the selector switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelectorState {
    pub p4: bool,
    pub p6: bool,
    pub p7: bool,
    pub p9: bool,
    pub p10: bool,
    pub p11: bool,
    pub p12: bool,
}

impl SelectorState {
    /// Configuration keys of the sense lines, in field order
    pub const LINE_NAMES: [&'static str; 7] = ["p4", "p6", "p7", "p9", "p10", "p11", "p12"];

    /// Build from line levels in [`Self::LINE_NAMES`] order
    pub const fn from_levels(levels: [bool; 7]) -> Self {
        Self {
            p4: levels[0],
            p6: levels[1],
            p7: levels[2],
            p9: levels[3],
            p10: levels[4],
            p11: levels[5],
            p12: levels[6],
        }
    }
}

/// Actuator feedback lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorState {
    pub pump_drain: bool,
    pub pump_circulation: bool,
    pub valve_inlet: bool,
    pub valve_outlet: bool,
    pub heating: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_names_unique() {
        for (i, a) in InputLine::ALL.iter().enumerate() {
            for b in &InputLine::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn test_selector_from_levels() {
        let state = SelectorState::from_levels([false, false, false, true, false, false, true]);
        assert!(state.p9 && state.p12);
        assert!(!state.p4 && !state.p11);
    }

    #[test]
    fn test_output_names_unique() {
        for (i, a) in OutputLine::ALL.iter().enumerate() {
            for b in &OutputLine::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }
}
