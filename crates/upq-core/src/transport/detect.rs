//! Transport backend selection, performed once at startup.
//!
//! The config override always wins; otherwise a multi-file context takes the
//! batch backend when it is available and everything else gets the form
//! backend, which is always available.

use crate::config::{TransportKind, UpqConfig};

/// Whether the batch backend is usable in this build/environment.
pub fn batch_supported() -> bool {
    true
}

/// Chooses the transport backend for a widget.
pub fn detect(cfg: &UpqConfig, multi_file: bool) -> TransportKind {
    if let Some(kind) = cfg.transport {
        return kind;
    }
    if multi_file && batch_supported() {
        TransportKind::Batch
    } else {
        TransportKind::Form
    }
}
