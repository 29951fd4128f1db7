//! Energy meter client
//!
//! Talks to a Shelly-style smart plug over its RPC interface. The total
//! energy counter is captured once at startup; each run reports the
//! difference from that baseline.

use std::time::Duration;

use hydrochron_core::telemetry::EnergyReading;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::Result;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct SwitchStatus {
    aenergy: Option<ActiveEnergy>,
    apower: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ActiveEnergy {
    total: Option<f64>,
}

/// One meter response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterStatus {
    /// Cumulative energy in Wh
    pub total_wh: f64,
    /// Present power draw in W
    pub power_w: Option<i64>,
}

/// Parse a `Switch.GetStatus` response body
///
/// `None` when the body has no `aenergy.total`, which means no meter is
/// attached to the switch.
pub fn parse_switch_status(body: &str) -> Option<MeterStatus> {
    let status: SwitchStatus = serde_json::from_str(body).ok()?;
    let total_wh = status.aenergy?.total?;
    Some(MeterStatus {
        total_wh,
        power_w: status.apower.map(|w| w as i64),
    })
}

/// Status URL for a meter host (`host`, `host/` or `http://host`)
pub fn status_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    let host = host.strip_prefix("http://").unwrap_or(host);
    format!("http://{host}/rpc/Switch.GetStatus?id=0")
}

/// Energy meter with a fixed baseline
pub struct EnergyMeter {
    client: reqwest::Client,
    url: Option<String>,
    baseline_wh: f64,
    last: Option<MeterStatus>,
}

impl EnergyMeter {
    /// A meter that always reports nothing
    pub fn disconnected() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
            baseline_wh: 0.0,
            last: None,
        }
    }

    /// Probe the meter and capture the baseline
    ///
    /// If the meter does not answer with an energy total it stays
    /// disconnected for the life of the process.
    pub async fn connect(host: Option<&str>) -> Result<Self> {
        let Some(host) = host else {
            info!("No energy meter configured");
            return Ok(Self::disconnected());
        };
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let url = status_url(host);

        match fetch(&client, &url).await {
            Some(status) => {
                info!(total_wh = status.total_wh, "Energy meter connected");
                Ok(Self {
                    client,
                    url: Some(url),
                    baseline_wh: status.total_wh,
                    last: Some(status),
                })
            }
            None => {
                warn!(%url, "Energy meter not found");
                Ok(Self::disconnected())
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.url.is_some()
    }

    /// Energy used since startup and present power draw
    ///
    /// Falls back to the last good reading if the meter does not answer.
    pub async fn reading(&mut self) -> EnergyReading {
        let Some(url) = &self.url else {
            return EnergyReading::default();
        };
        match fetch(&self.client, url).await {
            Some(status) => self.last = Some(status),
            None => debug!("Energy meter read failed, reusing last reading"),
        }
        self.relative(self.last)
    }

    fn relative(&self, status: Option<MeterStatus>) -> EnergyReading {
        match status {
            Some(status) => EnergyReading {
                consumed_wh: (status.total_wh - self.baseline_wh) as i64,
                power_w: status.power_w,
            },
            None => EnergyReading::default(),
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Option<MeterStatus> {
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body = response.text().await.ok()?;
    parse_switch_status(&body)
}
