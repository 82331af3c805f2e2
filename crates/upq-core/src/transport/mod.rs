//! Upload transports: the mechanisms that actually move bytes to the server.
//!
//! A transport announces readiness and completion through two distinct
//! signals (`Ready`, `Response`) rather than one overloaded load event, so
//! consumers never have to infer meaning from the current lifecycle stage.

mod batch;
mod detect;
mod form;

pub use batch::BatchTransport;
pub use detect::{batch_supported, detect};
pub use form::FormTransport;

use anyhow::Result;

/// Signal emitted by a transport to its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport surface finished initializing and can accept a selection.
    Ready { upload_id: u64 },
    /// Locally observed upload progress for one queued file (batch transport).
    Progress {
        upload_id: u64,
        file_index: usize,
        bytes: u64,
    },
    /// The transfer attempt finished; `success` reflects the HTTP exchange.
    Response { upload_id: u64, success: bool },
}

pub type TransportEventSender = tokio::sync::mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventReceiver = tokio::sync::mpsc::UnboundedReceiver<TransportEvent>;

/// Creates the channel a driver uses to receive transport signals.
pub fn channel() -> (TransportEventSender, TransportEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// One file queued on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    pub name: String,
    pub size: u64,
}

/// Capability set every transport provides. Implementations are selected once
/// at startup (see [`detect`]) and injected into frames via a factory.
pub trait UploadTransport: Send {
    /// Initializes the transport surface; emits `Ready` when usable.
    fn prepare(&mut self);

    /// Begins sending. Idempotent: a transport that already submitted
    /// must treat a second call as a no-op.
    fn submit(&mut self) -> Result<()>;

    /// Best-effort abort of the in-flight transfer.
    fn abort(&mut self);

    /// Releases transport resources; no signals fire afterwards.
    fn dispose(&mut self);

    /// Called when the frame's selection was accepted and the upload awaits
    /// its slot. Default does nothing; transports with a manual submit
    /// control use it to disable/relabel that control.
    fn on_queued(&mut self, _wait_text: Option<&str>) {}

    /// Files queued on this transport, for multi-file transports. The default
    /// single-file transports report none; the frame's own selection is used.
    fn queued_files(&self) -> Vec<QueuedFile> {
        Vec::new()
    }
}
