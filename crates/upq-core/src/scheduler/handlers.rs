//! Lifecycle signal handlers. Each method corresponds to one external signal
//! delivered by the driver: transport events, poll outcomes, or user actions.

use crate::monitor::{PollControl, PollOutcome};
use crate::progress::ProgressFile;
use crate::scheduler::{UploadScheduler, WidgetId};

impl UploadScheduler {
    /// A frame's transport finished preparing and can accept a selection.
    pub fn transport_ready(&mut self, widget: WidgetId, upload_id: u64) {
        let Some(w) = self.widget_mut(widget) else {
            return;
        };
        if let Some(frame) = w.frame_mut(upload_id) {
            frame.mark_loaded();
        }
    }

    /// A file was picked for a loaded frame. Queues it and asks for a slot.
    pub fn file_selected(
        &mut self,
        widget: WidgetId,
        upload_id: u64,
        raw_name: &str,
        size: Option<u64>,
    ) {
        let Some(w) = self.widget_mut(widget) else {
            return;
        };
        if w.select_file(upload_id, raw_name, size) {
            self.request_next_upload();
        }
    }

    /// Explicit send on a widget whose auto-send is off. No-op while a send
    /// is already in progress.
    pub fn send_widget(&mut self, widget: WidgetId) {
        let Some(w) = self.widget_mut(widget) else {
            return;
        };
        if w.send() {
            self.request_next_upload();
        }
    }

    /// The transport delivered its final response for a frame. Tears the
    /// frame down; completion events are the monitor's to fire.
    pub fn transfer_ended(&mut self, widget: WidgetId, upload_id: u64) {
        self.finish(widget, upload_id);
    }

    /// The monitor observed completion for a frame. Finishes the progress
    /// display, completes the session, then tears the frame down.
    pub fn transfer_complete(&mut self, widget: WidgetId, upload_id: u64) {
        if let Some(w) = self.widget_mut(widget) {
            if w.frame(upload_id).is_some() {
                w.display.complete();
                w.complete_session();
            }
        }
        self.finish(widget, upload_id);
    }

    /// Applies one monitor poll outcome and tells the poll loop whether to
    /// keep going.
    pub fn poll_outcome(
        &mut self,
        widget: WidgetId,
        upload_id: u64,
        outcome: PollOutcome,
    ) -> PollControl {
        let Some(idx) = self.widgets.iter().position(|w| w.id == widget) else {
            return PollControl::Stop;
        };
        if self.widgets[idx].frame(upload_id).is_none() {
            // Frame already torn down; the loop is stale.
            return PollControl::Stop;
        }
        match outcome {
            PollOutcome::Progress { done, total } => {
                self.apply_progress(idx, upload_id, done, total);
                PollControl::Continue
            }
            PollOutcome::Complete => {
                self.transfer_complete(widget, upload_id);
                PollControl::Stop
            }
            PollOutcome::Cancelled => {
                tracing::info!(%widget, upload_id, "upload cancelled by monitor");
                self.finish(widget, upload_id);
                PollControl::Stop
            }
            PollOutcome::UnknownPid => {
                // The receiver has not seen the request yet: the poll raced
                // ahead of the submit, or the submit never happened. Force
                // the submit once and keep polling.
                let w = &mut self.widgets[idx];
                if let Some(frame) = w.frame_mut(upload_id) {
                    if let Err(err) = frame.force_submit() {
                        tracing::warn!(%widget, upload_id, "forced submit failed: {:#}", err);
                    }
                }
                PollControl::Continue
            }
        }
    }

    fn apply_progress(&mut self, idx: usize, upload_id: u64, done: u64, total: u64) {
        let w = &mut self.widgets[idx];
        let (tracked, name) = match w.frame_mut(upload_id) {
            Some(frame) => (frame.progress_file_id, frame.file_name.clone()),
            None => return,
        };
        if tracked.is_none() {
            if w.display.initialized() {
                // Another path (a batch transport) already owns the display.
                tracing::debug!(upload_id, "monitor progress dropped, display already tracking");
            } else {
                let file = ProgressFile::new(name.unwrap_or_else(|| "upload".to_string()), total);
                let file_id = file.id;
                if let Err(err) = w.display.add(file) {
                    tracing::warn!(upload_id, "cannot track upload progress: {}", err);
                }
                if let Err(err) = w.display.init() {
                    tracing::warn!(upload_id, "cannot initialize progress display: {}", err);
                }
                if let Some(frame) = w.frame_mut(upload_id) {
                    frame.progress_file_id = Some(file_id);
                }
            }
        }
        let file_id = match w.frame_mut(upload_id).and_then(|f| f.progress_file_id) {
            Some(file_id) => file_id,
            None => return,
        };
        if let Err(err) = w.display.set_progress(file_id, done) {
            tracing::debug!(upload_id, "progress update dropped: {}", err);
            return;
        }
        match w.display.update() {
            Ok(percent) => tracing::debug!(upload_id, percent, done, total, "progress"),
            Err(err) => tracing::debug!(upload_id, "progress render failed: {}", err),
        }
    }

    /// Byte counter from a batch transport for the file at `file_index`
    /// within the current send batch.
    pub fn batch_progress(
        &mut self,
        widget: WidgetId,
        _upload_id: u64,
        file_index: usize,
        bytes: u64,
    ) {
        let Some(w) = self.widget_mut(widget) else {
            return;
        };
        if let Err(err) = w.display.set_progress_at(file_index, bytes) {
            tracing::debug!(%widget, file_index, "batch progress dropped: {}", err);
            return;
        }
        if let Err(err) = w.display.update() {
            tracing::debug!(%widget, "progress render failed: {}", err);
        }
    }

    /// Cancels a widget's in-progress send: flags every frame's monitor and
    /// transport, then tears the frames down. No-op when nothing is sending.
    pub fn cancel_widget(&mut self, widget: WidgetId) {
        let Some(idx) = self.widgets.iter().position(|w| w.id == widget) else {
            return;
        };
        if !self.widgets[idx].cancel_session() {
            return;
        }
        let ids = self.widgets[idx].frame_ids();
        for upload_id in ids {
            self.cancel_frame_inner(widget, upload_id);
        }
    }

    /// Cancels a single frame regardless of session state. A queued frame
    /// goes straight to ended without ever holding a slot.
    pub fn cancel_frame(&mut self, widget: WidgetId, upload_id: u64) {
        self.cancel_frame_inner(widget, upload_id);
    }

    fn cancel_frame_inner(&mut self, widget: WidgetId, upload_id: u64) {
        let Some(w) = self.widget_mut(widget) else {
            return;
        };
        let Some(frame) = w.frame_mut(upload_id) else {
            return;
        };
        frame.cancel();
        self.finish(widget, upload_id);
    }
}
