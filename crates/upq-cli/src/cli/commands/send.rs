//! `upq send` – upload files through the scheduler with live progress.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use upq_core::config::{TransportKind, UpqConfig, UploadSettings};
use upq_core::events::{self, UploadEvent};
use upq_core::progress::ProgressRenderer;
use upq_core::scheduler::{spawn_poll_loops, UploadScheduler};
use upq_core::select::{TransportContext, TransportFactory, UploadSelect};
use upq_core::transport::{
    self, BatchTransport, FormTransport, TransportEvent, TransportEventSender, UploadTransport,
};

/// Renders the aggregate upload percentage on one console line.
struct ConsoleRenderer;

impl ProgressRenderer for ConsoleRenderer {
    fn render(&mut self, percent: u8) {
        print!("\r  uploading {:3}%", percent);
        let _ = std::io::stdout().flush();
    }

    fn complete(&mut self) {
        println!("\r  uploading 100%");
    }
}

pub async fn run_send(
    cfg: &UpqConfig,
    files: Vec<PathBuf>,
    mut settings: UploadSettings,
    force_batch: bool,
) -> Result<()> {
    anyhow::ensure!(!files.is_empty(), "no files to send");
    for file in &files {
        anyhow::ensure!(file.is_file(), "not a file: {}", file.display());
    }
    // Fail on an unusable receiver before any transport is built.
    settings
        .receiver_url("preflight", 0)
        .context("invalid receiver")?;

    let mut cfg = cfg.clone();
    if force_batch {
        cfg.transport = Some(TransportKind::Batch);
    }
    let kind = transport::detect(&cfg, files.len() > 1);
    // The form transport carries one file per frame; queueing maps frame N to
    // file N. The batch transport takes the whole list on frame 0.
    settings.queue_enabled = kind == TransportKind::Form;
    tracing::info!(?kind, files = files.len(), "starting send");

    let (transport_tx, mut transport_rx) = transport::channel();
    let (event_tx, mut event_rx) = events::channel();

    let factory = make_factory(kind, files.clone(), settings.maximum_size, transport_tx);
    let widget = UploadSelect::new(settings, Box::new(ConsoleRenderer), factory, Some(event_tx));

    let sched = Arc::new(Mutex::new(UploadScheduler::new(&cfg)));
    let wid = sched.lock().unwrap().register(widget);

    let expected = match kind {
        TransportKind::Form => files.len(),
        TransportKind::Batch => 1,
    };
    let mut responded = 0usize;
    let mut failed = 0usize;
    let mut completed = 0usize;

    while responded < expected {
        tokio::select! {
            ev = transport_rx.recv() => {
                let Some(ev) = ev else { break };
                match ev {
                    TransportEvent::Ready { upload_id } => {
                        let mut s = sched.lock().unwrap();
                        s.transport_ready(wid, upload_id);
                        if let Some(path) = frame_file(kind, &files, upload_id) {
                            let name = path.to_string_lossy();
                            let size = std::fs::metadata(path).ok().map(|m| m.len());
                            s.file_selected(wid, upload_id, &name, size);
                        }
                    }
                    TransportEvent::Progress { upload_id, file_index, bytes } => {
                        sched.lock().unwrap().batch_progress(wid, upload_id, file_index, bytes);
                    }
                    TransportEvent::Response { upload_id, success } => {
                        responded += 1;
                        let mut s = sched.lock().unwrap();
                        if success {
                            s.transfer_complete(wid, upload_id);
                        } else {
                            tracing::warn!(upload_id, "receiver rejected upload");
                            failed += 1;
                            s.transfer_ended(wid, upload_id);
                        }
                    }
                }
                spawn_poll_loops(&sched);
            }
            ev = event_rx.recv() => {
                let Some(ev) = ev else { break };
                match ev {
                    UploadEvent::Complete { process_id, .. } => {
                        completed += 1;
                        tracing::info!(pid = %process_id, "send operation complete");
                    }
                    UploadEvent::Cancel { process_id, .. } => {
                        tracing::info!(pid = %process_id, "send operation cancelled");
                    }
                    UploadEvent::Send { .. } | UploadEvent::Ready { .. } => {}
                }
            }
        }
    }

    sched.lock().unwrap().deregister(wid);
    println!(
        "{} of {} upload(s) delivered ({} send operation(s) completed)",
        responded - failed,
        expected,
        completed
    );
    anyhow::ensure!(failed == 0, "{} upload(s) failed", failed);
    Ok(())
}

/// File backing a given frame, if the frame should receive a selection.
fn frame_file(kind: TransportKind, files: &[PathBuf], upload_id: u64) -> Option<&PathBuf> {
    match kind {
        TransportKind::Form => files.get(upload_id as usize),
        // One frame carries the whole batch; its selection is the first file.
        TransportKind::Batch if upload_id == 0 => files.first(),
        TransportKind::Batch => None,
    }
}

fn make_factory(
    kind: TransportKind,
    files: Vec<PathBuf>,
    maximum_size: Option<u64>,
    transport_tx: TransportEventSender,
) -> TransportFactory {
    Box::new(move |ctx: TransportContext<'_>| {
        let receiver = match ctx.settings.receiver_url(ctx.process_id, ctx.upload_id) {
            Ok(url) => url,
            Err(err) => {
                // Screened out before the scheduler was built.
                tracing::error!("invalid receiver URL: {:#}", err);
                String::new()
            }
        };
        match kind {
            TransportKind::Form => Box::new(FormTransport::new(
                receiver,
                files.get(ctx.upload_id as usize).cloned(),
                ctx.upload_id,
                transport_tx.clone(),
            )) as Box<dyn UploadTransport>,
            TransportKind::Batch => {
                let mut batch =
                    BatchTransport::new(receiver, maximum_size, ctx.upload_id, transport_tx.clone());
                if ctx.upload_id == 0 {
                    for file in &files {
                        if let Err(err) = batch.add_file(file.clone()) {
                            tracing::warn!("cannot queue {}: {:#}", file.display(), err);
                        }
                    }
                }
                Box::new(batch) as Box<dyn UploadTransport>
            }
        }
    })
}

