//! Global upload scheduler.
//!
//! Owns every registered widget and enforces the global concurrency limit.
//! All lifecycle signals (transport readiness, file selection, poll outcomes,
//! transport responses) enter through methods on [`UploadScheduler`]; the
//! scheduler mutates widget state and queues [`StartedUpload`] descriptors for
//! the driver to turn into poll loops.

mod handlers;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::UpqConfig;
use crate::monitor::{run_poll_loop, PollTask, TransferMonitor};
use crate::select::UploadSelect;

/// Stable handle for a registered widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub u64);

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Descriptor for an upload the scheduler just admitted. The driver drains
/// these and spawns one poll loop per descriptor.
pub struct StartedUpload {
    pub widget: WidgetId,
    pub upload_id: u64,
    pub monitor: TransferMonitor,
    pub interval: Duration,
    pub poll_enabled: Arc<AtomicBool>,
}

impl StartedUpload {
    pub fn poll_task(&self) -> PollTask {
        PollTask {
            monitor: self.monitor.clone(),
            interval: self.interval,
            enabled: Arc::clone(&self.poll_enabled),
        }
    }
}

pub struct UploadScheduler {
    limit: usize,
    default_interval_ms: u64,
    active_uploads: usize,
    widgets: Vec<UploadSelect>,
    next_widget_id: u64,
    pending_starts: Vec<StartedUpload>,
}

impl UploadScheduler {
    pub fn new(config: &UpqConfig) -> Self {
        Self::with_limit_and_interval(config.max_active_uploads, config.progress_interval_ms)
    }

    /// Scheduler with the given concurrency limit and the default poll
    /// interval. A limit of zero is treated as one.
    pub fn with_limit(limit: usize) -> Self {
        Self::with_limit_and_interval(limit, 1000)
    }

    fn with_limit_and_interval(limit: usize, default_interval_ms: u64) -> Self {
        Self {
            limit: limit.max(1),
            default_interval_ms,
            active_uploads: 0,
            widgets: Vec::new(),
            next_widget_id: 0,
            pending_starts: Vec::new(),
        }
    }

    /// Registers a widget. Registration order is the order the scheduler
    /// scans for queued frames when a slot frees up.
    pub fn register(&mut self, mut widget: UploadSelect) -> WidgetId {
        let id = WidgetId(self.next_widget_id);
        self.next_widget_id += 1;
        widget.id = id;
        tracing::debug!(%id, pid = widget.process_id(), "widget registered");
        self.widgets.push(widget);
        id
    }

    /// Removes a widget, cancelling its session and tearing down its frames.
    /// Slots the widget held are returned and handed to the next queued frame.
    pub fn deregister(&mut self, id: WidgetId) {
        let Some(idx) = self.index(id) else {
            return;
        };
        let mut widget = self.widgets.remove(idx);
        widget.cancel_session();
        let held = widget.teardown();
        self.active_uploads = self.active_uploads.saturating_sub(held);
        tracing::debug!(%id, released = held, "widget deregistered");
        self.request_next_upload();
    }

    pub fn has_slot(&self) -> bool {
        self.active_uploads < self.limit
    }

    pub fn active_uploads(&self) -> usize {
        self.active_uploads
    }

    pub fn widget(&self, id: WidgetId) -> Option<&UploadSelect> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub(crate) fn widget_mut(&mut self, id: WidgetId) -> Option<&mut UploadSelect> {
        self.widgets.iter_mut().find(|w| w.id == id)
    }

    fn index(&self, id: WidgetId) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    /// Scans widgets in registration order and admits the first queued frame
    /// if a slot is free. At most one upload is started per call.
    pub fn request_next_upload(&mut self) {
        if !self.has_slot() {
            return;
        }
        let default_interval_ms = self.default_interval_ms;
        for widget in &mut self.widgets {
            if let Some(started) = widget.try_start_next_queued_frame(default_interval_ms) {
                self.active_uploads += 1;
                tracing::info!(
                    widget = %started.widget,
                    upload_id = started.upload_id,
                    active = self.active_uploads,
                    "upload started"
                );
                self.pending_starts.push(started);
                return;
            }
        }
    }

    /// Hands the driver the descriptors for uploads admitted since the last
    /// call.
    pub fn take_started_uploads(&mut self) -> Vec<StartedUpload> {
        std::mem::take(&mut self.pending_starts)
    }

    /// Ends one frame and reassigns its slot if it held one.
    fn finish(&mut self, widget: WidgetId, upload_id: u64) {
        let Some(idx) = self.index(widget) else {
            return;
        };
        let Some(held_slot) = self.widgets[idx].finish_frame(upload_id) else {
            return;
        };
        if held_slot {
            self.active_uploads = self.active_uploads.saturating_sub(1);
            self.request_next_upload();
        }
    }
}

/// Drains pending admissions and runs one poll loop per started upload.
/// Admissions triggered from inside a poll outcome (a completed upload
/// freeing its slot for the next queued frame) are drained in turn, so every
/// started upload gets a live poll loop. Must be called on a tokio runtime.
pub fn spawn_poll_loops(sched: &Arc<Mutex<UploadScheduler>>) {
    let started = sched.lock().expect("scheduler lock poisoned").take_started_uploads();
    for s in started {
        let sched = Arc::clone(sched);
        let (widget, upload_id) = (s.widget, s.upload_id);
        tokio::spawn(run_poll_loop(s.poll_task(), move |outcome| {
            let control = sched
                .lock()
                .expect("scheduler lock poisoned")
                .poll_outcome(widget, upload_id, outcome);
            spawn_poll_loops(&sched);
            control
        }));
    }
}
