//! Remote backend sink

use std::time::Duration;

use hydrochron_protocol::{IsAlive, RunState};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Reachability change worth logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEdge {
    Lost,
    Restored,
}

/// Tracks backend reachability so failures are logged once, not per tick
#[derive(Debug, Clone, Copy)]
pub struct LinkHealth {
    up: bool,
}

impl Default for LinkHealth {
    fn default() -> Self {
        Self { up: true }
    }
}

impl LinkHealth {
    /// Record one request outcome; returns the edge if reachability changed
    pub fn record(&mut self, ok: bool) -> Option<LinkEdge> {
        let edge = match (self.up, ok) {
            (true, false) => Some(LinkEdge::Lost),
            (false, true) => Some(LinkEdge::Restored),
            _ => None,
        };
        self.up = ok;
        edge
    }

    pub fn is_up(&self) -> bool {
        self.up
    }
}

/// HTTP client for the telemetry backend
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    health: LinkHealth,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            health: LinkHealth::default(),
        })
    }

    /// Endpoint URL for a backend path such as `insert/is_alive`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url, path)
    }

    pub async fn send_is_alive(&mut self, message: &IsAlive<'_>) -> Result<()> {
        self.post("insert/is_alive", message).await
    }

    pub async fn send_run_state(&mut self, message: &RunState<'_>) -> Result<()> {
        self.post("insert/run_state", message).await
    }

    async fn post<T: Serialize + ?Sized>(&mut self, path: &str, body: &T) -> Result<()> {
        let url = self.endpoint(path);
        let result = match self.client.post(&url).json(body).send().await {
            Ok(response) => response.error_for_status().map(|_| ()),
            Err(e) => Err(e),
        };

        match (self.health.record(result.is_ok()), &result) {
            (Some(LinkEdge::Lost), Err(e)) => warn!(%url, error = %e, "Backend unreachable"),
            (Some(LinkEdge::Restored), _) => info!("Backend reachable again"),
            _ => {}
        }
        result.map_err(Into::into)
    }
}
