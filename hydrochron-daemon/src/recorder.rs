//! Local CSV run logs
//!
//! The supervisor queues rows; a dedicated task appends them so disk I/O
//! never runs on the control loop.
//!
//! - `{start}_DataRecord.csv`: one row per control tick of a run
//! - `RunningLog.csv`: one summary row per completed run

use std::fmt;
use std::path::{Path, PathBuf};

use hydrochron_core::{ProgramId, StepId, Timestamp};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::channels::RECORD_QUEUE_DEPTH;
use crate::error::Result;

/// Shared summary file name
pub const SUMMARY_FILE: &str = "RunningLog.csv";

/// Per-run tick file name
pub fn tick_file_name(run_start: Timestamp) -> String {
    format!("{run_start}_DataRecord.csv")
}

/// One control tick of a run
#[derive(Debug, Clone, PartialEq)]
pub struct TickRow {
    pub run_start: Timestamp,
    /// Local wall time, `HH:MM:SS`
    pub time_of_day: String,
    pub runtime_s: i64,
    pub thermo_stop: bool,
    pub step: StepId,
    pub temperature_x10: i16,
}

impl fmt::Display for TickRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{:.1}",
            self.time_of_day,
            self.runtime_s,
            self.thermo_stop,
            self.step,
            f32::from(self.temperature_x10) / 10.0
        )
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRow {
    pub run_start: Timestamp,
    pub program: ProgramId,
    pub estimated_runtime_s: i64,
    pub actual_runtime_s: i64,
    pub energy_wh: i64,
}

impl fmt::Display for CompletionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{}",
            self.run_start,
            self.program,
            self.estimated_runtime_s,
            self.actual_runtime_s,
            self.energy_wh
        )
    }
}

/// A row for the recorder task
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Tick(TickRow),
    Completion(CompletionRow),
}

impl Record {
    fn path(&self, directory: &Path) -> PathBuf {
        match self {
            Record::Tick(row) => directory.join(tick_file_name(row.run_start)),
            Record::Completion(_) => directory.join(SUMMARY_FILE),
        }
    }

    fn line(&self) -> String {
        match self {
            Record::Tick(row) => format!("{row}\n"),
            Record::Completion(row) => format!("{row}\n"),
        }
    }
}

/// Queue into the recorder task
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<Record>,
}

impl RecorderHandle {
    /// Queue a row without waiting
    ///
    /// Rows are dropped with a warning if the writer has fallen behind.
    pub fn record(&self, record: Record) {
        if let Err(e) = self.tx.try_send(record) {
            warn!(error = %e, "Run log row dropped");
        }
    }
}

/// Start the recorder task writing into `directory`
///
/// The task exits once every handle is dropped and the queue is drained.
pub fn spawn_recorder(directory: PathBuf) -> (RecorderHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Record>(RECORD_QUEUE_DEPTH);
    let task = tokio::spawn(async move {
        debug!(directory = %directory.display(), "Recorder started");
        while let Some(record) = rx.recv().await {
            if let Err(e) = append(&directory, &record).await {
                error!(error = %e, "Failed to write run log");
            }
        }
        debug!("Recorder stopped");
    });
    (RecorderHandle { tx }, task)
}

async fn append(directory: &Path, record: &Record) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(record.path(directory))
        .await?;
    file.write_all(record.line().as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(runtime_s: i64, step: StepId) -> Record {
        Record::Tick(TickRow {
            run_start: 1_700_000_000,
            time_of_day: "12:00:00".into(),
            runtime_s,
            thermo_stop: step == 7,
            step,
            temperature_x10: 435,
        })
    }

    #[test]
    fn test_row_formats() {
        let Record::Tick(row) = tick(60, 7) else {
            unreachable!()
        };
        assert_eq!(row.to_string(), "12:00:00;60;true;7;43.5");

        let summary = CompletionRow {
            run_start: 1_700_000_000,
            program: 3,
            estimated_runtime_s: 8100,
            actual_runtime_s: 8342,
            energy_wh: 1210,
        };
        assert_eq!(summary.to_string(), "1700000000;3;8100;8342;1210");
    }

    #[tokio::test]
    async fn test_recorder_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn_recorder(dir.path().to_path_buf());

        handle.record(tick(1, 1));
        handle.record(tick(2, 2));
        handle.record(Record::Completion(CompletionRow {
            run_start: 1_700_000_000,
            program: 3,
            estimated_runtime_s: 100,
            actual_runtime_s: 2,
            energy_wh: 0,
        }));
        drop(handle);
        task.await.unwrap();

        let ticks =
            std::fs::read_to_string(dir.path().join("1700000000_DataRecord.csv")).unwrap();
        assert_eq!(ticks, "12:00:00;1;false;1;43.5\n12:00:00;2;false;2;43.5\n");

        let summary = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary, "1700000000;3;100;2;0\n");
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_logged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let (handle, task) = spawn_recorder(missing.clone());
        handle.record(tick(1, 1));
        drop(handle);
        task.await.unwrap();
        assert!(!missing.exists());
    }
}
