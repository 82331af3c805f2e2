//! Upload frame: one attempt to transfer one selected file.
//!
//! A frame owns its transport handle and advances through a strict stage
//! sequence: `None → Loaded → Queued → Uploading`, after which it is removed
//! from its widget (the terminal "ended" state). Cancellation may skip stages
//! but always runs the same teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::monitor::TransferMonitor;
use crate::transport::UploadTransport;

/// Lifecycle stage of an upload frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Transport surface not yet initialized.
    None,
    /// Transport ready; awaiting a file selection.
    Loaded,
    /// File selected; awaiting an upload slot.
    Queued,
    /// Slot granted; transfer in flight.
    Uploading,
}

pub struct UploadFrame {
    /// Sequence number unique within the owning widget.
    pub upload_id: u64,
    pub stage: LoadStage,
    pub(crate) transport: Box<dyn UploadTransport>,
    /// Whether the transport has been told to submit. Distinct from the stage:
    /// a frame can be `Uploading` with submission still pending (the monitor's
    /// unknown-pid outcome forces it, defending the submission race).
    pub(crate) submitted: bool,
    /// Base name of the selected file, if any.
    pub file_name: Option<String>,
    /// Size of the selected file when the selector knows it.
    pub file_size: Option<u64>,
    /// Progress file registered for this frame, once progress was observed.
    pub(crate) progress_file_id: Option<u64>,
    poll_enabled: Arc<AtomicBool>,
    monitor: Option<TransferMonitor>,
}

impl UploadFrame {
    /// Creates a frame and initializes its transport surface.
    pub(crate) fn new(upload_id: u64, mut transport: Box<dyn UploadTransport>) -> Self {
        transport.prepare();
        Self {
            upload_id,
            stage: LoadStage::None,
            transport,
            submitted: false,
            file_name: None,
            file_size: None,
            progress_file_id: None,
            poll_enabled: Arc::new(AtomicBool::new(false)),
            monitor: None,
        }
    }

    /// Transport surface became usable. Ignored unless the frame is fresh.
    pub(crate) fn mark_loaded(&mut self) {
        if self.stage == LoadStage::None {
            self.stage = LoadStage::Loaded;
        }
    }

    /// Records an accepted selection and queues the frame.
    pub(crate) fn mark_queued(&mut self, name: String, size: Option<u64>) {
        self.file_name = Some(name);
        self.file_size = size;
        self.stage = LoadStage::Queued;
    }

    /// Slot granted: transitions to `Uploading`, submits the transport and
    /// enables polling against the given monitor.
    pub(crate) fn start(&mut self, monitor: TransferMonitor) -> Result<()> {
        self.stage = LoadStage::Uploading;
        self.poll_enabled.store(true, Ordering::Relaxed);
        self.monitor = Some(monitor);
        self.submitted = true;
        self.transport.submit()
    }

    /// Submits the transport if it has not been told to yet (unknown-pid race).
    pub(crate) fn force_submit(&mut self) -> Result<()> {
        if self.submitted {
            return Ok(());
        }
        self.submitted = true;
        self.transport.submit()
    }

    /// Whether this frame currently holds an upload slot.
    pub(crate) fn holds_slot(&self) -> bool {
        self.stage == LoadStage::Uploading
    }

    pub(crate) fn stop_poll(&mut self) {
        self.poll_enabled.store(false, Ordering::Relaxed);
    }

    pub(crate) fn poll_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.poll_enabled)
    }

    /// Delivers the cancel instruction to the monitor, and aborts the
    /// transport if the transfer is in flight. The instruction is sent
    /// out-of-band: the frame's poll loop stops at teardown, so the next
    /// scheduled poll cannot be relied on to carry it.
    pub(crate) fn cancel(&mut self) {
        if let Some(monitor) = &self.monitor {
            monitor.deliver_cancel();
        }
        if self.stage == LoadStage::Uploading {
            self.transport.abort();
        }
    }

    /// Full teardown: stops polling and releases the transport.
    pub(crate) fn dispose(&mut self) {
        self.stop_poll();
        self.transport.dispose();
    }

    pub(crate) fn notify_queued(&mut self, wait_text: Option<&str>) {
        self.transport.on_queued(wait_text);
    }
}

/// Strips a client-supplied path prefix down to the base file name.
/// Returns None for empty or whitespace-only selections.
pub fn base_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .trim();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}
