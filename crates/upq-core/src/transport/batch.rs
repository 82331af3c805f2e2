//! Batch transport: multiple files queued on a single frame, uploaded
//! sequentially. Unlike the form transport it observes its own upload
//! progress locally and emits per-file `Progress` signals instead of relying
//! on the server monitor.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use super::form::post_file;
use super::{QueuedFile, TransportEvent, TransportEventSender, UploadTransport};

struct BatchFile {
    path: PathBuf,
    name: String,
    size: u64,
}

pub struct BatchTransport {
    receiver_url: String,
    files: Vec<BatchFile>,
    maximum_size: Option<u64>,
    upload_id: u64,
    events: TransportEventSender,
    abort: Arc<AtomicBool>,
    submitted: bool,
}

impl BatchTransport {
    pub fn new(
        receiver_url: impl Into<String>,
        maximum_size: Option<u64>,
        upload_id: u64,
        events: TransportEventSender,
    ) -> Self {
        Self {
            receiver_url: receiver_url.into(),
            files: Vec::new(),
            maximum_size,
            upload_id,
            events,
            abort: Arc::new(AtomicBool::new(false)),
            submitted: false,
        }
    }

    /// Queues a file for upload. Returns false (and skips the file) when it
    /// exceeds the configured size cap or cannot be inspected.
    pub fn add_file(&mut self, path: PathBuf) -> Result<bool> {
        anyhow::ensure!(!self.submitted, "cannot queue files after submission");
        let size = std::fs::metadata(&path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        if let Some(cap) = self.maximum_size {
            if size > cap {
                tracing::warn!(
                    path = %path.display(),
                    size,
                    cap,
                    "selection exceeds maximum size, ignoring"
                );
                return Ok(false);
            }
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.files.push(BatchFile { path, name, size });
        Ok(true)
    }
}

impl UploadTransport for BatchTransport {
    fn prepare(&mut self) {
        let _ = self.events.send(TransportEvent::Ready {
            upload_id: self.upload_id,
        });
    }

    fn submit(&mut self) -> Result<()> {
        if self.submitted {
            return Ok(());
        }
        self.submitted = true;

        let url = self.receiver_url.clone();
        let files: Vec<(PathBuf, usize)> = self
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.clone(), i))
            .collect();
        let abort = Arc::clone(&self.abort);
        let events = self.events.clone();
        let upload_id = self.upload_id;
        thread::spawn(move || {
            let mut success = true;
            for (path, index) in files {
                if abort.load(Ordering::Relaxed) {
                    success = false;
                    break;
                }
                let field = format!("file_{}_{}", upload_id, index);
                let progress_events = events.clone();
                let result = post_file(&url, &field, &path, &abort, |bytes| {
                    let _ = progress_events.send(TransportEvent::Progress {
                        upload_id,
                        file_index: index,
                        bytes,
                    });
                });
                match result {
                    Ok(code) if (200..300).contains(&code) => {}
                    Ok(code) => {
                        tracing::warn!(upload_id, index, code, "batch upload rejected");
                        success = false;
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(upload_id, index, "batch upload failed: {:#}", err);
                        success = false;
                        break;
                    }
                }
            }
            let _ = events.send(TransportEvent::Response { upload_id, success });
        });
        Ok(())
    }

    fn abort(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    fn dispose(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    fn queued_files(&self) -> Vec<QueuedFile> {
        self.files
            .iter()
            .map(|f| QueuedFile {
                name: f.name.clone(),
                size: f.size,
            })
            .collect()
    }
}
