//! Appliance access trait

use crate::lines::{ActuatorState, InputLine, SelectorState};

/// Access to the physical appliance
///
/// Methods take `&self` so the control loop and the telemetry task can
/// share one instance. Implementations are expected to return promptly
/// and to absorb their own read failures (returning the last good value);
/// the sequencer treats every read as successful.
pub trait Machine {
    /// Read the water temperature in 0.1°C units (e.g. 455 = 45.5°C)
    fn read_temperature_x10(&self) -> i16;

    /// Read a single input line
    fn read_input(&self, line: InputLine) -> bool;

    /// Read the program selector sense lines
    ///
    /// Only meaningful while the selector relays are energised.
    fn read_selector(&self) -> SelectorState;

    /// Read all actuator feedback lines
    fn read_actuators(&self) -> ActuatorState {
        ActuatorState {
            pump_drain: self.read_input(InputLine::PumpDrain),
            pump_circulation: self.read_input(InputLine::PumpCirculation),
            valve_inlet: self.read_input(InputLine::ValveInlet),
            valve_outlet: self.read_input(InputLine::ValveOutlet),
            heating: self.read_input(InputLine::Heating),
        }
    }

    /// Energise or release every relay used to probe the program selector
    fn set_all_relays(&self, on: bool);

    /// Switch the appliance mains relay
    fn set_main_relay(&self, on: bool);

    /// Switch the status LED
    fn set_led(&self, on: bool);

    /// Sound the buzzer for the given number of passes
    fn set_buzzer(&self, passes: u8);
}
