//! Transfer monitor: polls the server status endpoint for byte-level progress.
//!
//! Uses the curl crate (libcurl) for the GET; each poll parses the minimal
//! status document and yields one [`PollOutcome`]. Cancellation is
//! cooperative: requesting cancel makes the next outgoing poll carry a
//! `command=cancel` instruction instead of a plain status query.

mod parse;
pub mod poll;

pub use parse::{parse_status, StatusParseError};
pub use poll::{run_poll_loop, PollTask};

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Result of one status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Bytes transferred / total bytes, as reported by the server.
    Progress { done: u64, total: u64 },
    /// The server observed the full upload.
    Complete,
    /// The server acknowledged a cancellation.
    Cancelled,
    /// The server has not yet seen the corresponding POST (submission race).
    UnknownPid,
}

/// Whether the poll loop should schedule another poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Polls a monitor URL for the progress of one in-flight transfer.
#[derive(Debug, Clone)]
pub struct TransferMonitor {
    monitor_url: String,
    cancel: Arc<AtomicBool>,
}

impl TransferMonitor {
    pub fn new(monitor_url: impl Into<String>) -> Self {
        Self {
            monitor_url: monitor_url.into(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn monitor_url(&self) -> &str {
        &self.monitor_url
    }

    /// Makes the next outgoing poll instruct the server to cancel the upload.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Flags the cancel and sends the instruction on a worker thread without
    /// waiting for the reply. For teardown paths that stop the poll loop
    /// before its next scheduled poll could carry the command.
    pub fn deliver_cancel(&self) {
        self.request_cancel();
        let monitor = self.clone();
        std::thread::spawn(move || {
            if let Err(err) = monitor.poll_once() {
                tracing::debug!("cancel delivery failed: {:#}", err);
            }
        });
    }

    /// URL for the next poll, with the cancel instruction appended if requested.
    fn poll_url(&self) -> Result<String> {
        if !self.cancel_requested() {
            return Ok(self.monitor_url.clone());
        }
        let mut url = Url::parse(&self.monitor_url)
            .with_context(|| format!("invalid monitor URL: {}", self.monitor_url))?;
        url.query_pairs_mut().append_pair("command", "cancel");
        Ok(url.into())
    }

    /// Issues one blocking status GET. Returns `Ok(None)` for a non-success
    /// HTTP status; the caller retries on its normal schedule. Runs in the
    /// current thread; call from `spawn_blocking` when used from async code.
    pub fn poll_once(&self) -> Result<Option<PollOutcome>> {
        let url = self.poll_url()?;
        let (code, body) = http_get(&url)?;
        if !(200..300).contains(&code) {
            tracing::debug!(code, "monitor poll returned non-success status, dropping");
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&body);
        let outcome = parse_status(&text).context("parse monitor status document")?;
        Ok(Some(outcome))
    }
}

/// Performs a plain GET and returns (status code, body).
fn http_get(url: &str) -> Result<(u32, Vec<u8>)> {
    let mut body = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().context("monitor GET failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    Ok((code, body))
}
