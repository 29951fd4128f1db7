//! Linux sysfs GPIO and 1-wire backend
//!
//! Relay outputs are active-low: writing `0` energises a relay. Inputs are
//! plain levels. The DS18B20 probe is read from its `w1_slave` file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI16, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hydrochron_hal::{InputLine, Machine, OutputLine, SelectorState};
use tracing::{debug, error, warn};

use super::SharedSignal;
use crate::config::HardwareSection;
use crate::error::{Error, Result};

/// Step contact sampling period
const EDGE_POLL: Duration = Duration::from_millis(5);

/// Buzzer on/off time per pass
const BUZZER_PULSE: Duration = Duration::from_millis(200);

/// Parse a DS18B20 `w1_slave` dump into 0.1°C
///
/// Returns `None` on a CRC failure or a malformed file.
pub fn parse_w1_slave(text: &str) -> Option<i16> {
    let mut lines = text.lines();
    if !lines.next()?.trim_end().ends_with("YES") {
        return None;
    }
    let (_, raw) = lines.next()?.split_once("t=")?;
    let millideg: i32 = raw.trim().parse().ok()?;
    let half = if millideg < 0 { -50 } else { 50 };
    i16::try_from((millideg + half) / 100).ok()
}

/// Rising edge detector for a sampled level
#[derive(Debug, Default)]
pub struct RisingEdge {
    last: bool,
}

impl RisingEdge {
    /// Feed one sample; true on a low-to-high change
    pub fn update(&mut self, level: bool) -> bool {
        let rising = level && !self.last;
        self.last = level;
        rising
    }
}

fn pin_dir(root: &Path, pin: u32) -> PathBuf {
    root.join(format!("gpio{pin}"))
}

fn read_level(path: &Path) -> Result<bool> {
    let text = fs::read_to_string(path)?;
    Ok(text.trim() == "1")
}

fn export(root: &Path, pin: u32, direction: &str) -> Result<()> {
    let dir = pin_dir(root, pin);
    if !dir.exists() {
        fs::write(root.join("export"), pin.to_string())?;
    }
    fs::write(dir.join("direction"), direction)?;
    Ok(())
}

fn lookup(pins: &BTreeMap<String, u32>, name: &str, kind: &str) -> Result<u32> {
    pins.get(name)
        .copied()
        .ok_or_else(|| Error::Config(format!("hardware.{kind}.{name} is not set")))
}

/// Appliance wired to the host's GPIO header
pub struct SysfsMachine {
    gpio_root: PathBuf,
    w1_slave: PathBuf,
    inputs: HashMap<InputLine, u32>,
    selector: [u32; 7],
    outputs: HashMap<OutputLine, u32>,
    last_temperature_x10: AtomicI16,
}

impl SysfsMachine {
    /// Export and configure every configured line
    ///
    /// Outputs start released.
    pub fn open(config: &HardwareSection) -> Result<Self> {
        if config.w1_device.is_empty() {
            return Err(Error::Config("hardware.w1_device is not set".into()));
        }
        let root = config.gpio_root.clone();

        let mut inputs = HashMap::new();
        for line in InputLine::ALL {
            let pin = lookup(&config.inputs, line.name(), "inputs")?;
            export(&root, pin, "in")?;
            inputs.insert(line, pin);
        }

        let mut selector = [0u32; 7];
        for (slot, name) in selector.iter_mut().zip(SelectorState::LINE_NAMES) {
            *slot = lookup(&config.inputs, name, "inputs")?;
            export(&root, *slot, "in")?;
        }

        let mut outputs = HashMap::new();
        for line in OutputLine::ALL {
            let pin = lookup(&config.outputs, line.name(), "outputs")?;
            export(&root, pin, "out")?;
            fs::write(pin_dir(&root, pin).join("value"), "1")?;
            outputs.insert(line, pin);
        }

        Ok(Self {
            w1_slave: config.w1_root.join(&config.w1_device).join("w1_slave"),
            gpio_root: root,
            inputs,
            selector,
            outputs,
            last_temperature_x10: AtomicI16::new(0),
        })
    }

    fn value_path(&self, pin: u32) -> PathBuf {
        pin_dir(&self.gpio_root, pin).join("value")
    }

    fn read_pin(&self, pin: u32) -> bool {
        match read_level(&self.value_path(pin)) {
            Ok(level) => level,
            Err(e) => {
                warn!(pin, error = %e, "GPIO read failed");
                false
            }
        }
    }

    fn drive(&self, line: OutputLine, on: bool) {
        let Some(&pin) = self.outputs.get(&line) else {
            return;
        };
        // Active-low relay board
        let value = if on { "0" } else { "1" };
        if let Err(e) = fs::write(self.value_path(pin), value) {
            error!(line = line.name(), error = %e, "GPIO write failed");
        }
    }

    /// Start watching the step contact for rising edges
    pub fn watch_step_contact(&self, signal: SharedSignal) -> Result<EdgeWatcher> {
        let pin = self
            .inputs
            .get(&InputLine::StepTransition)
            .copied()
            .ok_or_else(|| Error::Hardware("step transition line not configured".into()))?;
        EdgeWatcher::spawn(self.value_path(pin), signal)
    }
}

impl Machine for SysfsMachine {
    fn read_temperature_x10(&self) -> i16 {
        let reading = fs::read_to_string(&self.w1_slave)
            .ok()
            .and_then(|text| parse_w1_slave(&text));
        match reading {
            Some(value) => {
                self.last_temperature_x10.store(value, Ordering::Relaxed);
                value
            }
            None => {
                warn!(path = %self.w1_slave.display(), "Temperature read failed, keeping last value");
                self.last_temperature_x10.load(Ordering::Relaxed)
            }
        }
    }

    fn read_input(&self, line: InputLine) -> bool {
        self.inputs
            .get(&line)
            .is_some_and(|&pin| self.read_pin(pin))
    }

    fn read_selector(&self) -> SelectorState {
        SelectorState::from_levels(self.selector.map(|pin| self.read_pin(pin)))
    }

    fn set_all_relays(&self, on: bool) {
        self.drive(OutputLine::SelectorRelays, on);
    }

    fn set_main_relay(&self, on: bool) {
        self.drive(OutputLine::MainRelay, on);
    }

    fn set_led(&self, on: bool) {
        self.drive(OutputLine::Led, on);
    }

    fn set_buzzer(&self, passes: u8) {
        let Some(&pin) = self.outputs.get(&OutputLine::Buzzer) else {
            return;
        };
        let path = self.value_path(pin);
        // Beep off-thread so callers return immediately
        thread::spawn(move || {
            if let Err(e) = beep(&path, passes, BUZZER_PULSE) {
                error!(line = OutputLine::Buzzer.name(), error = %e, "GPIO write failed");
            }
        });
    }
}

/// Pulse an active-low buzzer line, stopping at the first failed write
fn beep(path: &Path, passes: u8, pulse: Duration) -> std::io::Result<()> {
    for _ in 0..passes {
        fs::write(path, "0")?;
        thread::sleep(pulse);
        fs::write(path, "1")?;
        thread::sleep(pulse);
    }
    Ok(())
}

/// Background thread raising the transition signal on step contact edges
///
/// The thread does nothing but sample the line and raise the flag.
pub struct EdgeWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EdgeWatcher {
    fn spawn(path: PathBuf, signal: SharedSignal) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("step-contact".into())
            .spawn(move || {
                debug!(path = %path.display(), "Step contact watcher started");
                let mut edge = RisingEdge::default();
                while !flag.load(Ordering::Relaxed) {
                    if let Ok(level) = read_level(&path) {
                        if edge.update(level) {
                            signal.raise();
                        }
                    }
                    thread::sleep(EDGE_POLL);
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop sampling and join the thread
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Step contact watcher panicked");
            }
        }
    }
}

impl Drop for EdgeWatcher {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
