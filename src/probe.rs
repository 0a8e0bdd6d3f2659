use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

/// Outcome of a failed probe. The variant decides both the status code the
/// caller sees and the alert template sent to Telegram.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Target answered with a 4xx status.
    #[error("access error: {0}")]
    Client(u16),
    /// Target answered with a 5xx status.
    #[error("source returned server error: {0}")]
    Server(u16),
    /// Connection could not be established at all.
    #[error("source unreachable: connection failed")]
    Unreachable { detail: String },
    /// No response within the probe deadline.
    #[error("source unreachable: timed out")]
    Timeout { detail: String },
    /// Anything else, including URLs reqwest refuses to parse.
    #[error("source unreachable: {detail}")]
    Unknown { detail: String },
}

impl ProbeError {
    fn from_transport(err: reqwest::Error) -> Self {
        let is_timeout = err.is_timeout();
        let is_connect = err.is_connect();
        // {:#} renders the full cause chain, e.g. "... Connection refused"
        let detail = format!("{:#}", anyhow::Error::new(err));
        if is_timeout {
            ProbeError::Timeout { detail }
        } else if is_connect {
            ProbeError::Unreachable { detail }
        } else {
            ProbeError::Unknown { detail }
        }
    }

    /// Alert body for this failure, HTML parse mode.
    pub fn alert_text(&self, url: &str, timestamp: &str) -> String {
        match self {
            ProbeError::Client(code) => format!(
                "<b>Source access problem</b>\nSource: {url}\nStatus code: {code}\nTime: {timestamp}"
            ),
            ProbeError::Server(code) => format!(
                "<b>Source unavailable (server error)</b>\nSource: {url}\nStatus code: {code}\nTime: {timestamp}"
            ),
            ProbeError::Unreachable { detail } => format!(
                "<b>Source connection error</b>\nURL: {url}\nDetails: {detail}\nTime: {timestamp}"
            ),
            ProbeError::Timeout { detail } => format!(
                "<b>Source timeout</b>\nURL: {url}\nDetails: {detail}\nTime: {timestamp}"
            ),
            ProbeError::Unknown { detail } => format!(
                "<b>Unexpected error while checking source</b>\nURL: {url}\nDetails: {detail}\nTime: {timestamp}"
            ),
        }
    }
}

/// Partition an upstream status code the way the service promises: 5xx is a
/// server failure, 4xx an access failure, everything below 400 counts as
/// reachable. `None` means the probe succeeded.
pub fn classify_status(code: u16) -> Option<ProbeError> {
    if code >= 500 {
        Some(ProbeError::Server(code))
    } else if code >= 400 {
        Some(ProbeError::Client(code))
    } else {
        None
    }
}

#[derive(Clone)]
pub struct Prober {
    http: Client,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    /// GET the target once, no retries. Returns the upstream status code when
    /// the source is considered reachable.
    pub async fn check(&self, url: &str) -> Result<u16, ProbeError> {
        debug!(url, "Probing source");
        let resp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return Err(ProbeError::from_transport(e)),
        };

        let code = resp.status().as_u16();
        info!(url, code, "Source responded");
        match classify_status(code) {
            None => Ok(code),
            Some(err) => Err(err),
        }
    }
}
