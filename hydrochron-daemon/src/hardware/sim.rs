//! Simulated appliance
//!
//! Lines and temperature are plain in-memory values. Tests poke them
//! directly; `--simulate` runs [`autopilot`] to pulse the step contact.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use hydrochron_hal::{InputLine, Machine, SelectorState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::SharedSignal;

/// Highest water temperature the autopilot heats to (0.1°C)
const AUTOPILOT_MAX_TEMP_X10: i16 = 700;

#[derive(Debug, Default)]
struct SimState {
    temperature_x10: i16,
    inputs: HashMap<InputLine, bool>,
    selector: SelectorState,
    selector_relays: bool,
    main_relay: bool,
    led: bool,
    buzzer: Vec<u8>,
}

/// In-memory appliance
#[derive(Debug, Default)]
pub struct SimulatedMachine {
    state: Mutex<SimState>,
}

impl SimulatedMachine {
    pub fn new(temperature_x10: i16) -> Self {
        let machine = Self::default();
        machine.set_temperature_x10(temperature_x10);
        machine
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_temperature_x10(&self, value: i16) {
        self.lock().temperature_x10 = value;
    }

    pub fn set_input(&self, line: InputLine, level: bool) {
        self.lock().inputs.insert(line, level);
    }

    /// Selector position seen while the probe relays are energised
    pub fn set_selector(&self, selector: SelectorState) {
        self.lock().selector = selector;
    }

    pub fn main_relay(&self) -> bool {
        self.lock().main_relay
    }

    pub fn led(&self) -> bool {
        self.lock().led
    }

    pub fn selector_relays(&self) -> bool {
        self.lock().selector_relays
    }

    /// Every buzzer request so far, in passes
    pub fn buzzer_history(&self) -> Vec<u8> {
        self.lock().buzzer.clone()
    }
}

impl Machine for SimulatedMachine {
    fn read_temperature_x10(&self) -> i16 {
        self.lock().temperature_x10
    }

    fn read_input(&self, line: InputLine) -> bool {
        self.lock().inputs.get(&line).copied().unwrap_or(false)
    }

    fn read_selector(&self) -> SelectorState {
        let state = self.lock();
        if state.selector_relays {
            state.selector
        } else {
            SelectorState::default()
        }
    }

    fn set_all_relays(&self, on: bool) {
        self.lock().selector_relays = on;
    }

    fn set_main_relay(&self, on: bool) {
        self.lock().main_relay = on;
    }

    fn set_led(&self, on: bool) {
        self.lock().led = on;
    }

    fn set_buzzer(&self, passes: u8) {
        self.lock().buzzer.push(passes);
    }
}

/// Drive a simulated run
///
/// While the mains relay is on, pulses the step contact every
/// `step_period` and warms the water. The cam reads as being at its zero
/// position throughout.
pub async fn autopilot(
    machine: std::sync::Arc<SimulatedMachine>,
    signal: SharedSignal,
    step_period: Duration,
    cancel: CancellationToken,
) {
    info!(?step_period, "Simulated appliance running");
    machine.set_input(InputLine::ZeroPosition, true);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(step_period) => {}
        }
        if !machine.main_relay() {
            continue;
        }
        let temperature = machine.read_temperature_x10();
        machine.set_temperature_x10((temperature + 5).min(AUTOPILOT_MAX_TEMP_X10));
        signal.raise();
        debug!("Simulated step contact pulse");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrochron_core::signal::TransitionSignal;
    use std::sync::Arc;

    #[test]
    fn test_selector_needs_relays() {
        let machine = SimulatedMachine::new(200);
        machine.set_selector(SelectorState {
            p11: true,
            ..Default::default()
        });
        assert_eq!(machine.read_selector(), SelectorState::default());
        machine.set_all_relays(true);
        assert!(machine.read_selector().p11);
    }

    #[test]
    fn test_inputs_and_outputs() {
        let machine = SimulatedMachine::new(455);
        assert_eq!(machine.read_temperature_x10(), 455);
        assert!(!machine.read_input(InputLine::ValveOutlet));
        machine.set_input(InputLine::ValveOutlet, true);
        assert!(machine.read_actuators().valve_outlet);

        machine.set_main_relay(true);
        machine.set_led(true);
        machine.set_buzzer(3);
        assert!(machine.main_relay() && machine.led());
        assert_eq!(machine.buzzer_history(), [3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_autopilot_pulses_only_when_powered() {
        let machine = Arc::new(SimulatedMachine::new(200));
        let signal = Arc::new(TransitionSignal::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(autopilot(
            machine.clone(),
            signal.clone(),
            Duration::from_secs(2),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!signal.is_raised());
        assert!(machine.read_input(InputLine::ZeroPosition));

        machine.set_main_relay(true);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(signal.take());
        assert_eq!(machine.read_temperature_x10(), 205);

        cancel.cancel();
        task.await.unwrap();
    }
}
