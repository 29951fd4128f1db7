//! Wall clock in unix seconds
//!
//! The wall time is sampled once and then advanced with the tokio clock,
//! so paused-time tests drive the sequencer deterministically.

use chrono::{Local, TimeZone, Utc};
use hydrochron_core::Timestamp;
use tokio::time::Instant;

/// Unix seconds derived from a monotonic tokio instant
#[derive(Debug, Clone, Copy)]
pub struct UnixClock {
    base: Timestamp,
    origin: Instant,
}

impl UnixClock {
    /// Clock anchored on the current wall time
    pub fn system() -> Self {
        Self::starting_at(Utc::now().timestamp().max(0) as Timestamp)
    }

    /// Clock anchored on a fixed unix time
    pub fn starting_at(base: Timestamp) -> Self {
        Self {
            base,
            origin: Instant::now(),
        }
    }

    /// Current unix time in whole seconds
    pub fn now(&self) -> Timestamp {
        self.base + self.origin.elapsed().as_secs()
    }
}

/// Local `HH:MM:SS` for a unix timestamp
pub fn time_of_day(ts: Timestamp) -> String {
    Local
        .timestamp_opt(ts as i64, 0)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_tokio_time() {
        let clock = UnixClock::starting_at(1_700_000_000);
        assert_eq!(clock.now(), 1_700_000_000);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(clock.now(), 1_700_000_002);
    }

    #[test]
    fn test_time_of_day_shape() {
        let text = time_of_day(1_700_000_000);
        assert_eq!(text.len(), 8);
        assert_eq!(text.as_bytes()[2], b':');
        assert_eq!(text.as_bytes()[5], b':');
    }
}
