//! Supervisor loop
//!
//! Owns the program state machine. Identifies the selected program,
//! starts the appliance, runs the 1 Hz control loop until the program
//! passes its terminal step, then shuts the appliance down and waits for
//! telemetry to finish.

use std::time::Duration;

use hydrochron_core::catalog::{program_name, PROGRAM_STOP_START};
use hydrochron_core::program::{Calibration, ProgramRunState, ProgramStateMachine};
use hydrochron_core::report::ReportStage;
use hydrochron_core::selector::identify_program;
use hydrochron_core::signal::TransitionGate;
use hydrochron_core::steps::is_thermo_stop;
use hydrochron_core::{ProgramId, Timestamp};
use hydrochron_hal::InputLine;
use tokio::time::{sleep, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::channels::{run_state_channel, RunStateRx, RunStateTx};
use crate::clock::{time_of_day, UnixClock};
use crate::config::Config;
use crate::hardware::{SharedMachine, SharedSignal};
use crate::recorder::{CompletionRow, Record, RecorderHandle, TickRow};
use crate::tasks::telemetry::TelemetryCollector;

/// Control loop period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Supervisor timings
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Re-scan interval while the selector reads stop/start
    pub program_poll: Duration,
    /// Relay settle time before the selector is read
    pub selector_settle: Duration,
    /// Poll interval while waiting for the zero position
    pub zero_position_poll: Duration,
    /// Longest wait for telemetry to reach `Ended`
    pub shutdown_grace: Duration,
}

impl SupervisorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            program_poll: config.machine.program_poll(),
            selector_settle: config.machine.selector_settle(),
            zero_position_poll: config.machine.zero_position_poll(),
            shutdown_grace: config.telemetry.shutdown_grace(),
        }
    }
}

pub struct Supervisor {
    machine: SharedMachine,
    signal: SharedSignal,
    program: ProgramStateMachine,
    gate: TransitionGate,
    run_state: RunStateTx,
    recorder: RecorderHandle,
    clock: UnixClock,
    settings: SupervisorSettings,
}

impl Supervisor {
    pub fn new(
        settings: SupervisorSettings,
        calibration: Calibration,
        machine: SharedMachine,
        signal: SharedSignal,
        recorder: RecorderHandle,
        clock: UnixClock,
    ) -> Self {
        let program = ProgramStateMachine::new(calibration, clock.now());
        let (run_state, _) = run_state_channel(program.snapshot());
        Self {
            machine,
            signal,
            program,
            gate: TransitionGate::new(),
            run_state,
            recorder,
            clock,
            settings,
        }
    }

    /// Reader for the published run state
    pub fn subscribe(&self) -> RunStateRx {
        self.run_state.subscribe()
    }

    pub fn state(&self) -> &ProgramRunState {
        self.program.state()
    }

    fn publish(&self) {
        self.run_state.send_replace(self.program.snapshot());
    }

    /// Scan the selector once
    async fn scan_selector(&self) -> ProgramId {
        self.machine.set_all_relays(true);
        sleep(self.settings.selector_settle).await;
        let lines = self.machine.read_selector();
        self.machine.set_all_relays(false);
        identify_program(&lines)
    }

    /// Scan until a program other than stop/start is selected
    pub async fn identify(&mut self) -> ProgramId {
        loop {
            let program = self.scan_selector().await;
            if program != PROGRAM_STOP_START {
                self.program.select_program(program);
                return program;
            }
            info!(
                retry_in = ?self.settings.program_poll,
                "No program selected, waiting"
            );
            sleep(self.settings.program_poll).await;
        }
    }

    /// Identify the program, power the appliance and start the run
    pub async fn start_run(&mut self) {
        self.machine.set_buzzer(1);
        let program = self.identify().await;
        info!(program, name = program_name(program), "Program selected");

        self.machine.set_main_relay(true);
        self.machine.set_led(true);

        let now = self.clock.now();
        let temperature = self.machine.read_temperature_x10();
        self.program.start(now, temperature);
        info!(
            estimated_minutes = self.program.state().estimated_runtime_s / 60,
            "Program started"
        );
        self.publish();
    }

    /// One control tick
    pub fn tick(&mut self) {
        let signalled = self.signal.take();
        let now = self.clock.now();
        let temperature = self.machine.read_temperature_x10();
        let step = self.program.state().current_step;
        let time_left_step = self.program.time_left_step(now, temperature);

        if self.gate.should_advance(signalled, step, time_left_step) {
            let change = self.program.advance(None, now, temperature);
            debug!(
                from = change.from,
                to = change.to,
                time_left_step,
                "Step transition"
            );
            if change.finished {
                info!(
                    runtime_s = self.program.state().runtime(now),
                    "Program passed its terminal step"
                );
            }
        }

        let valve_outlet = self.machine.read_input(InputLine::ValveOutlet);
        if let Some(desync) = self.program.check_sync(valve_outlet, now, temperature) {
            warn!(
                old_step = desync.from,
                new_step = desync.to,
                valve_outlet,
                "Step desync corrected"
            );
        }

        self.publish();
        self.record_tick(now, temperature);
    }

    fn record_tick(&self, now: Timestamp, temperature_x10: i16) {
        let state = self.program.state();
        let Some(run_start) = state.run_start_time else {
            return;
        };
        self.recorder.record(Record::Tick(TickRow {
            run_start,
            time_of_day: time_of_day(now),
            runtime_s: state.runtime(now),
            thermo_stop: is_thermo_stop(state.current_step),
            step: state.current_step,
            temperature_x10,
        }));
    }

    /// Wait for the cam to return home, log the run and power down
    ///
    /// Stops the collector once it has finished reporting the run.
    pub async fn finish_run(&mut self, collector: TelemetryCollector) {
        info!("Waiting for zero position");
        while !self.machine.read_input(InputLine::ZeroPosition) {
            sleep(self.settings.zero_position_poll).await;
        }

        let state = self.program.snapshot();
        if let Some(run_start) = state.run_start_time {
            let row = CompletionRow {
                run_start,
                program: state.selected_program,
                estimated_runtime_s: state.estimated_runtime_s,
                actual_runtime_s: state.runtime(self.clock.now()),
                energy_wh: collector.status().energy.consumed_wh,
            };
            info!(
                estimated_s = row.estimated_runtime_s,
                actual_s = row.actual_runtime_s,
                energy_wh = row.energy_wh,
                "Run complete"
            );
            self.recorder.record(Record::Completion(row));
        }

        self.machine.set_led(false);
        self.machine.set_main_relay(false);
        self.machine.set_buzzer(3);

        let mut status = collector.subscribe();
        let ended = timeout(
            self.settings.shutdown_grace,
            status.wait_for(|s| s.stage == ReportStage::Ended),
        )
        .await
        .map(|r| r.is_ok());
        match ended {
            Ok(true) => debug!("Telemetry reporting ended"),
            Ok(false) => warn!("Telemetry collector exited before the run was reported"),
            Err(_) => warn!("Telemetry still reporting after grace period, stopping it"),
        }
        collector.stop().await;
    }

    /// Drive one complete run
    pub async fn run(mut self, collector: TelemetryCollector) {
        self.start_run().await;

        let mut ticker = tokio::time::interval(TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        while !self.program.state().is_finished() {
            ticker.tick().await;
            self.tick();
        }

        self.finish_run(collector).await;
    }
}
