//! Telemetry collector task
//!
//! Runs on its own phase-aligned schedule, independent of the control
//! loop. Each tick it copies the latest run state, advances the report
//! stage and dispatches to every configured sink.

use std::time::Duration;

use hydrochron_core::program::Calibration;
use hydrochron_core::report::{ReportStage, ReportStageMachine};
use hydrochron_core::telemetry::{SensorSample, TelemetrySnapshot};
use hydrochron_protocol::IsAlive;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::channels::{CollectorStatus, RunStateRx};
use crate::clock::UnixClock;
use crate::energy::EnergyMeter;
use crate::hardware::SharedMachine;
use crate::sinks::{BackendClient, SerialDisplay, Sinks};

/// Delay until the next tick on a grid of `interval` from `elapsed` zero
///
/// Keeps ticks on the grid even when dispatch takes a while.
pub fn next_fire_delay(elapsed: Duration, interval: Duration) -> Duration {
    let period = interval.as_nanos();
    if period == 0 {
        return Duration::ZERO;
    }
    let into_period = (elapsed.as_nanos() % period) as u64;
    interval - Duration::from_nanos(into_period)
}

/// Collector tunables
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub interval: Duration,
    pub afterrunning_secs: u64,
    pub device_identifier: String,
}

/// State owned by the collector task
struct Collector {
    session_id: u64,
    device_identifier: String,
    calibration: Calibration,
    machine: SharedMachine,
    run_state: RunStateRx,
    stages: ReportStageMachine,
    energy: EnergyMeter,
    backend: Option<BackendClient>,
    display: Option<SerialDisplay>,
    status: watch::Sender<CollectorStatus>,
    clock: UnixClock,
}

impl Collector {
    async fn collect_and_dispatch(&mut self) {
        let now = self.clock.now();
        // Copy out so no borrow of the channel is held across awaits
        let state = *self.run_state.borrow();

        let previous = self.stages.stage();
        let stage = self
            .stages
            .update(state.run_start_time, state.run_end_time, now);
        if stage != previous {
            info!(?previous, ?stage, "Report stage changed");
        }

        if !stage.samples_machine() {
            self.publish(stage);
            self.send_is_alive().await;
            return;
        }

        let sample = SensorSample {
            temperature_x10: self.machine.read_temperature_x10(),
            actuators: self.machine.read_actuators(),
        };
        let energy = self.energy.reading().await;
        let Some(snapshot) = TelemetrySnapshot::capture(
            &self.stages,
            &state,
            &self.calibration,
            now,
            sample,
            energy,
        ) else {
            return;
        };
        self.status.send_replace(CollectorStatus { stage, energy });
        debug!(
            step = snapshot.step,
            progress = snapshot.progress_percent,
            time_left_program = snapshot.time_left_program_s,
            "Telemetry snapshot"
        );

        let Self {
            session_id,
            device_identifier,
            backend,
            display,
            ..
        } = self;

        let to_display = async {
            let Some(serial) = display.as_ref() else {
                return;
            };
            match snapshot.display_frame() {
                Ok(frame) => {
                    if let Err(e) = serial.send(frame).await {
                        error!(port = serial.port(), error = %e, "Serial display write failed");
                    }
                }
                Err(e) => error!(?e, "Display frame did not fit"),
            }
        };
        let to_backend = async {
            let Some(backend) = backend.as_mut() else {
                return;
            };
            let message = snapshot.run_state_message(*session_id, device_identifier);
            if let Err(e) = backend.send_run_state(&message).await {
                debug!(error = %e, "Run state not delivered");
            }
        };
        tokio::join!(to_display, to_backend);
    }

    fn publish(&self, stage: ReportStage) {
        self.status.send_modify(|status| status.stage = stage);
    }

    async fn send_is_alive(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let message = IsAlive {
            session_id: self.session_id,
            device_identifier: &self.device_identifier,
        };
        if let Err(e) = backend.send_is_alive(&message).await {
            debug!(error = %e, "Is-alive not delivered");
        }
    }
}

/// Handle to the running collector task
pub struct TelemetryCollector {
    session_id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    status: watch::Receiver<CollectorStatus>,
}

impl TelemetryCollector {
    /// Start collecting
    ///
    /// The session id is the unix time at construction. The first tick
    /// fires one `interval` after start.
    pub fn spawn(
        settings: CollectorSettings,
        calibration: Calibration,
        machine: SharedMachine,
        run_state: RunStateRx,
        energy: EnergyMeter,
        sinks: Sinks,
        clock: UnixClock,
    ) -> Self {
        let session_id = clock.now();
        info!(session_id, interval = ?settings.interval, "Starting telemetry collector");

        let (status_tx, status_rx) = watch::channel(CollectorStatus::default());
        let mut collector = Collector {
            session_id,
            device_identifier: settings.device_identifier,
            calibration,
            machine,
            run_state,
            stages: ReportStageMachine::new(settings.afterrunning_secs),
            energy,
            backend: sinks.backend,
            display: sinks.display,
            status: status_tx,
            clock,
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let interval = settings.interval;
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            loop {
                let delay = next_fire_delay(start.elapsed(), interval);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                collector.collect_and_dispatch().await;
            }
            debug!("Telemetry collector stopped");
        });

        Self {
            session_id,
            cancel,
            handle,
            status: status_rx,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Latest stage and energy reading
    pub fn status(&self) -> CollectorStatus {
        *self.status.borrow()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<CollectorStatus> {
        self.status.clone()
    }

    /// Detached stop path, usable after the collector itself has moved
    pub fn stopper(&self) -> CollectorStopper {
        CollectorStopper {
            cancel: self.cancel.clone(),
            status: self.status.clone(),
        }
    }

    /// Stop after the current tick and wait for the task to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Telemetry collector task failed");
        }
    }
}

/// Stops a collector whose handle is owned elsewhere
pub struct CollectorStopper {
    cancel: CancellationToken,
    status: watch::Receiver<CollectorStatus>,
}

impl CollectorStopper {
    /// Cancel the collector and wait until its task has exited
    pub async fn stop(mut self) {
        self.cancel.cancel();
        // The status sender is dropped with the task
        while self.status.changed().await.is_ok() {}
        debug!("Telemetry collector confirmed stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::run_state_channel;
    use crate::hardware::sim::SimulatedMachine;
    use crate::testing::serve;
    use hydrochron_core::program::ProgramStateMachine;
    use proptest::prelude::*;
    use std::sync::Arc;

    const BASE: u64 = 1_700_000_000;

    #[test]
    fn test_next_fire_delay() {
        let interval = Duration::from_secs(5);
        assert_eq!(next_fire_delay(Duration::ZERO, interval), interval);
        assert_eq!(
            next_fire_delay(Duration::from_millis(5300), interval),
            Duration::from_millis(4700)
        );
        assert_eq!(next_fire_delay(Duration::from_secs(10), interval), interval);
        assert_eq!(next_fire_delay(Duration::from_secs(3), Duration::ZERO), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn next_fire_stays_on_grid(elapsed_ms in 0u64..10_000_000, interval_ms in 1u64..600_000) {
            let elapsed = Duration::from_millis(elapsed_ms);
            let interval = Duration::from_millis(interval_ms);
            let delay = next_fire_delay(elapsed, interval);
            prop_assert!(delay > Duration::ZERO);
            prop_assert!(delay <= interval);
            prop_assert_eq!((elapsed + delay).as_millis() % interval.as_millis(), 0);
        }
    }

    fn spawn_with_sinks(
        run_state: RunStateRx,
        afterrunning_secs: u64,
        interval: Duration,
        sinks: Sinks,
    ) -> TelemetryCollector {
        let machine: SharedMachine = Arc::new(SimulatedMachine::new(200));
        TelemetryCollector::spawn(
            CollectorSettings {
                interval,
                afterrunning_secs,
                device_identifier: "test".into(),
            },
            Calibration::default(),
            machine,
            run_state,
            EnergyMeter::disconnected(),
            sinks,
            UnixClock::starting_at(BASE),
        )
    }

    fn spawn_collector(run_state: RunStateRx, afterrunning_secs: u64) -> TelemetryCollector {
        spawn_with_sinks(run_state, afterrunning_secs, Duration::from_secs(5), Sinks::default())
    }

    fn running_program() -> ProgramStateMachine {
        let mut program = ProgramStateMachine::new(Calibration::default(), BASE);
        program.select_program(3);
        program.start(BASE, 200);
        program
    }

    async fn wait_for(collector: &TelemetryCollector, stage: ReportStage) {
        let mut rx = collector.subscribe();
        rx.wait_for(|status| status.stage == stage).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_lifecycle() {
        let mut program = ProgramStateMachine::new(Calibration::default(), BASE);
        let (tx, rx) = run_state_channel(program.snapshot());
        let collector = spawn_collector(rx, 20);
        assert_eq!(collector.session_id(), BASE);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(collector.status().stage, ReportStage::Idle);

        program.select_program(3);
        program.start(BASE + 6, 200);
        tx.send_replace(program.snapshot());
        wait_for(&collector, ReportStage::Active).await;

        while !program.state().is_finished() {
            program.advance(None, BASE + 10, 200);
        }
        tx.send_replace(program.snapshot());

        // One more Active tick carries the end time
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(collector.status().stage, ReportStage::Active);
        wait_for(&collector, ReportStage::Draining).await;
        wait_for(&collector, ReportStage::Ended).await;

        collector.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_joins_task() {
        let program = ProgramStateMachine::new(Calibration::default(), BASE);
        let (_tx, rx) = run_state_channel(program.snapshot());
        let collector = spawn_collector(rx, 1800);
        let status = collector.subscribe();
        tokio::time::sleep(Duration::from_secs(12)).await;
        collector.stop().await;
        // Sender dropped with the task
        assert!(status.has_changed().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopper_reaches_detached_task() {
        let program = ProgramStateMachine::new(Calibration::default(), BASE);
        let (_tx, rx) = run_state_channel(program.snapshot());
        let collector = spawn_collector(rx, 1800);
        let stopper = collector.stopper();
        let status = collector.subscribe();

        // Dropping the handle detaches the task without stopping it
        drop(collector);
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(status.has_changed().is_ok());

        stopper.stop().await;
        assert!(status.has_changed().is_err());
    }

    #[tokio::test]
    async fn test_failing_display_does_not_block_backend() {
        let (base, mut received, _server) = serve(vec![String::from("{}"); 4]).await;
        let (_tx, rx) = run_state_channel(running_program().snapshot());
        let sinks = Sinks {
            backend: Some(BackendClient::new(&base).unwrap()),
            display: Some(SerialDisplay::new("/dev/hydrochron-no-such-port", 9600)),
        };
        let collector = spawn_with_sinks(rx, 1800, Duration::from_millis(200), sinks);

        let request = tokio::time::timeout(Duration::from_secs(10), received.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.target(), "POST /insert/run_state/");
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["session_id"], collector.session_id());
        assert_eq!(body["device_identifier"], "test");
        assert_eq!(body["program_selected_id"], 3);

        collector.stop().await;
    }

    #[tokio::test]
    async fn test_unreachable_backend_does_not_stall_collection() {
        let (_tx, rx) = run_state_channel(running_program().snapshot());
        let sinks = Sinks {
            backend: Some(BackendClient::new("http://127.0.0.1:9").unwrap()),
            display: None,
        };
        let collector = spawn_with_sinks(rx, 1800, Duration::from_millis(100), sinks);
        let mut status = collector.subscribe();

        // Each Active tick republishes the status, backend or not
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(10), status.changed())
                .await
                .unwrap()
                .unwrap();
        }
        assert_eq!(collector.status().stage, ReportStage::Active);
        collector.stop().await;
    }
}
