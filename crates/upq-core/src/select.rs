//! Upload widget: owns a set of upload frames, one session, and the progress
//! display for its send batches.
//!
//! Widgets never start uploads on their own; they queue frames and wait for
//! the scheduler to grant a slot via `try_start_next_queued_frame`.

use std::time::Duration;

use crate::config::UploadSettings;
use crate::events::{EventSender, UploadEvent};
use crate::frame::{base_name, LoadStage, UploadFrame};
use crate::monitor::TransferMonitor;
use crate::progress::{ProgressDisplay, ProgressFile, ProgressRenderer};
use crate::scheduler::{StartedUpload, WidgetId};
use crate::session::UploadSession;
use crate::transport::UploadTransport;

/// Everything a transport factory needs to build the transport for one frame.
pub struct TransportContext<'a> {
    pub upload_id: u64,
    pub process_id: &'a str,
    pub settings: &'a UploadSettings,
}

/// Builds the transport handle for a newly allocated frame.
pub type TransportFactory = Box<dyn FnMut(TransportContext<'_>) -> Box<dyn UploadTransport> + Send>;

pub struct UploadSelect {
    pub(crate) id: WidgetId,
    pub(crate) session: UploadSession,
    pub(crate) settings: UploadSettings,
    frames: Vec<UploadFrame>,
    next_upload_id: u64,
    pub(crate) active_uploads: usize,
    pub(crate) display: ProgressDisplay,
    events: Option<EventSender>,
    factory: TransportFactory,
}

impl UploadSelect {
    /// Creates a widget with one initial frame awaiting selection.
    pub fn new(
        settings: UploadSettings,
        renderer: Box<dyn ProgressRenderer>,
        factory: TransportFactory,
        events: Option<EventSender>,
    ) -> Self {
        let mut widget = Self {
            id: WidgetId(0),
            session: UploadSession::new(),
            settings,
            frames: Vec::new(),
            next_upload_id: 0,
            active_uploads: 0,
            display: ProgressDisplay::new(renderer),
            events,
            factory,
        };
        widget.add_frame();
        widget
    }

    pub fn process_id(&self) -> &str {
        self.session.process_id()
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Uploads currently in flight on this widget.
    pub fn active_uploads(&self) -> usize {
        self.active_uploads
    }

    /// Upload ids of the widget's live frames, in allocation order.
    pub fn frame_ids(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.upload_id).collect()
    }

    pub fn frame_stage(&self, upload_id: u64) -> Option<LoadStage> {
        self.frame(upload_id).map(|f| f.stage)
    }

    pub fn progress(&self) -> &ProgressDisplay {
        &self.display
    }

    /// Allocates a new frame (and its transport) so another file can be
    /// selected. Returns the new frame's upload id.
    pub(crate) fn add_frame(&mut self) -> u64 {
        let upload_id = self.next_upload_id;
        self.next_upload_id += 1;
        let transport = (self.factory)(TransportContext {
            upload_id,
            process_id: self.session.process_id(),
            settings: &self.settings,
        });
        self.frames.push(UploadFrame::new(upload_id, transport));
        upload_id
    }

    pub(crate) fn frame(&self, upload_id: u64) -> Option<&UploadFrame> {
        self.frames.iter().find(|f| f.upload_id == upload_id)
    }

    pub(crate) fn frame_mut(&mut self, upload_id: u64) -> Option<&mut UploadFrame> {
        self.frames.iter_mut().find(|f| f.upload_id == upload_id)
    }

    /// Records a file selection on a loaded frame. Empty selections and
    /// selections over the size cap are ignored without a transition.
    /// Returns true if the frame moved to `Queued`.
    pub(crate) fn select_file(
        &mut self,
        upload_id: u64,
        raw_name: &str,
        size: Option<u64>,
    ) -> bool {
        let Some(name) = base_name(raw_name) else {
            tracing::debug!(upload_id, "empty selection ignored");
            return false;
        };
        if let (Some(cap), Some(file_size)) = (self.settings.maximum_size, size) {
            if file_size > cap {
                tracing::warn!(upload_id, file_size, cap, "selection exceeds maximum size, ignoring");
                return false;
            }
        }

        let queue_enabled = self.settings.queue_enabled;
        let wait_text = self.settings.send_button_wait_text.clone();
        {
            let Some(frame) = self.frame_mut(upload_id) else {
                return false;
            };
            if frame.stage != LoadStage::Loaded {
                return false;
            }
            frame.mark_queued(name, size);
            if !queue_enabled {
                frame.notify_queued(wait_text.as_deref());
            }
        }
        if queue_enabled {
            // Keep a fresh frame available so the user can select more files
            // while this one awaits its slot.
            self.add_frame();
        }

        self.emit(UploadEvent::Ready { widget: self.id });
        if self.settings.auto_send {
            self.send();
        }
        true
    }

    /// Marks the session as sending and announces it. Returns false if a send
    /// operation is already in progress.
    pub(crate) fn send(&mut self) -> bool {
        if !self.session.send() {
            return false;
        }
        // A fresh send batch gets a fresh progress aggregate.
        self.display.reset();
        self.emit(UploadEvent::Send { widget: self.id });
        true
    }

    pub(crate) fn complete_session(&mut self) -> bool {
        if !self.session.complete() {
            return false;
        }
        let process_id = self.session.process_id().to_string();
        self.emit(UploadEvent::Complete {
            widget: self.id,
            process_id,
        });
        true
    }

    pub(crate) fn cancel_session(&mut self) -> bool {
        if !self.session.cancel() {
            return false;
        }
        let process_id = self.session.process_id().to_string();
        self.emit(UploadEvent::Cancel {
            widget: self.id,
            process_id,
        });
        true
    }

    /// Whether queued frames may be admitted: either the widget auto-sends or
    /// an explicit send is in progress.
    fn armed(&self) -> bool {
        self.settings.auto_send || self.session.is_sending()
    }

    /// Starts this widget's first queued frame, if any. Increments the
    /// widget-local active count; the scheduler accounts the global slot.
    pub(crate) fn try_start_next_queued_frame(
        &mut self,
        default_interval_ms: u64,
    ) -> Option<StartedUpload> {
        if !self.armed() {
            return None;
        }
        let idx = self
            .frames
            .iter()
            .position(|f| f.stage == LoadStage::Queued)?;
        let upload_id = self.frames[idx].upload_id;

        // Arm the session if this admission begins a new send batch.
        if !self.session.is_sending() {
            self.send();
        }

        let monitor_url = match self
            .settings
            .monitor_url(self.session.process_id(), upload_id)
        {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(upload_id, "cannot build monitor URL: {:#}", err);
                return None;
            }
        };
        let monitor = TransferMonitor::new(monitor_url);
        let interval = self
            .settings
            .progress_interval_ms
            .unwrap_or(default_interval_ms);

        // Multi-file transports know their whole batch up front; register it
        // with the display before the first byte moves.
        let queued = self.frames[idx].transport.queued_files();
        if !queued.is_empty() && !self.display.initialized() {
            for file in queued {
                let progress_file = ProgressFile::new(file.name, file.size);
                if let Err(err) = self.display.add(progress_file) {
                    tracing::warn!(upload_id, "cannot register batch file: {}", err);
                }
            }
            if let Err(err) = self.display.init() {
                tracing::warn!(upload_id, "cannot initialize progress display: {}", err);
            }
        }

        let frame = &mut self.frames[idx];
        if let Err(err) = frame.start(monitor.clone()) {
            tracing::warn!(upload_id, "transport submit failed: {:#}", err);
        }
        self.active_uploads += 1;

        Some(StartedUpload {
            widget: self.id,
            upload_id,
            monitor,
            interval: Duration::from_millis(interval),
            poll_enabled: frame.poll_token(),
        })
    }

    /// Ends a frame: stops polling, returns its slot if it held one, removes
    /// it, and in non-queueing mode allocates the replacement frame.
    /// Returns whether the frame held an active slot, or None if unknown.
    pub(crate) fn finish_frame(&mut self, upload_id: u64) -> Option<bool> {
        let idx = self
            .frames
            .iter()
            .position(|f| f.upload_id == upload_id)?;
        let held_slot = {
            let frame = &mut self.frames[idx];
            frame.stop_poll();
            frame.holds_slot()
        };
        if held_slot {
            self.active_uploads = self.active_uploads.saturating_sub(1);
        }
        let mut frame = self.frames.remove(idx);
        frame.dispose();
        if !self.settings.queue_enabled {
            self.add_frame();
        }
        Some(held_slot)
    }

    /// Disposes every frame and returns the number of slots the widget held.
    pub(crate) fn teardown(&mut self) -> usize {
        for frame in &mut self.frames {
            frame.cancel();
            frame.dispose();
        }
        self.frames.clear();
        let held = self.active_uploads;
        self.active_uploads = 0;
        held
    }

    pub(crate) fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
