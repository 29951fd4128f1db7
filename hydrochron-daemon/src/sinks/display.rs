//! Serial front panel sink

use std::io::Write;
use std::time::Duration;

use hydrochron_protocol::DisplayFrame;

use crate::error::{Error, Result};

const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Front panel on a serial port
///
/// The port is opened for each frame and closed again, so a display
/// that is unplugged and reconnected needs no recovery.
#[derive(Debug, Clone)]
pub struct SerialDisplay {
    port: String,
    baud: u32,
}

impl SerialDisplay {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Write one frame off the async runtime
    pub async fn send(&self, frame: DisplayFrame) -> Result<()> {
        let port = self.port.clone();
        let baud = self.baud;
        tokio::task::spawn_blocking(move || write_frame(&port, baud, frame.as_bytes()))
            .await
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}

fn write_frame(port: &str, baud: u32, bytes: &[u8]) -> Result<()> {
    let mut serial = serialport::new(port, baud).timeout(WRITE_TIMEOUT).open()?;
    serial.write_all(bytes)?;
    serial.flush()?;
    Ok(())
}
