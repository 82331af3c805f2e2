//! Application-facing upload notifications.
//!
//! Widgets announce lifecycle transitions over an optional channel; each event
//! fires exactly once per session transition (the session's sending flag is
//! the gate, see [`crate::session::UploadSession`]).

use crate::scheduler::WidgetId;

/// Notification emitted by a widget to application code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Files have been selected and are ready for uploading.
    Ready { widget: WidgetId },
    /// The widget began sending file data.
    Send { widget: WidgetId },
    /// The send operation was canceled.
    Cancel { widget: WidgetId, process_id: String },
    /// The send operation completed.
    Complete { widget: WidgetId, process_id: String },
}

pub type EventSender = tokio::sync::mpsc::UnboundedSender<UploadEvent>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<UploadEvent>;

/// Creates an event channel for widget notifications.
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
