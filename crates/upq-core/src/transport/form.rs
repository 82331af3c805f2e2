//! Default transport: one file per frame, sent as a multipart form POST.
//!
//! The POST runs on a worker thread (libcurl's blocking easy API); abort is
//! cooperative via a shared flag checked by the curl progress callback.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{TransportEvent, TransportEventSender, UploadTransport};

pub struct FormTransport {
    receiver_url: String,
    file: Option<PathBuf>,
    upload_id: u64,
    events: TransportEventSender,
    abort: Arc<AtomicBool>,
    submitted: bool,
}

impl FormTransport {
    /// Creates a transport bound to one receiver URL and (optionally) a file.
    /// A transport without a file backs a frame awaiting selection and never
    /// submits.
    pub fn new(
        receiver_url: impl Into<String>,
        file: Option<PathBuf>,
        upload_id: u64,
        events: TransportEventSender,
    ) -> Self {
        Self {
            receiver_url: receiver_url.into(),
            file,
            upload_id,
            events,
            abort: Arc::new(AtomicBool::new(false)),
            submitted: false,
        }
    }
}

impl UploadTransport for FormTransport {
    fn prepare(&mut self) {
        let _ = self.events.send(TransportEvent::Ready {
            upload_id: self.upload_id,
        });
    }

    fn submit(&mut self) -> Result<()> {
        if self.submitted {
            return Ok(());
        }
        let file = self
            .file
            .clone()
            .context("form transport has no file to submit")?;
        self.submitted = true;

        let url = self.receiver_url.clone();
        let field = format!("file_{}", self.upload_id);
        let abort = Arc::clone(&self.abort);
        let events = self.events.clone();
        let upload_id = self.upload_id;
        thread::spawn(move || {
            let success = match post_file(&url, &field, &file, &abort, |_| {}) {
                Ok(code) => (200..300).contains(&code),
                Err(err) => {
                    tracing::warn!(upload_id, "multipart POST failed: {:#}", err);
                    false
                }
            };
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

    fn on_queued(&mut self, wait_text: Option<&str>) {
        if let Some(text) = wait_text {
            tracing::debug!(upload_id = self.upload_id, wait_text = text, "upload queued");
        }
    }
}

/// Posts one file as a multipart form. Invokes `on_progress` with the number
/// of bytes uploaded so far; returns the HTTP status code. Aborts (with a curl
/// error) when the shared flag is set.
pub(crate) fn post_file(
    url: &str,
    field: &str,
    path: &Path,
    abort: &AtomicBool,
    mut on_progress: impl FnMut(u64),
) -> Result<u32> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid receiver URL")?;

    let mut form = curl::easy::Form::new();
    form.part(field)
        .file(path)
        .add()
        .map_err(|e| anyhow::anyhow!("build multipart form: {}", e))?;
    easy.httppost(form)?;

    easy.progress(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;

    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.progress_function(|_dl_total, _dl_now, _ul_total, ul_now| {
            on_progress(ul_now as u64);
            !abort.load(Ordering::Relaxed)
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().context("multipart POST failed")?;
    }

    easy.response_code().context("no response code")
}
