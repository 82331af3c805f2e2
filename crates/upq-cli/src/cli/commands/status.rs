//! `upq status` – one-shot query (or cancel) against a status monitor.

use anyhow::Result;
use upq_core::config::UploadSettings;
use upq_core::monitor::{PollOutcome, TransferMonitor};

pub async fn run_status(monitor: &str, pid: &str, upload_index: u64, cancel: bool) -> Result<()> {
    let settings = UploadSettings {
        receiver: monitor.to_string(),
        ..UploadSettings::default()
    };
    let url = settings.monitor_url(pid, upload_index)?;
    let monitor = TransferMonitor::new(url);
    if cancel {
        monitor.request_cancel();
    }

    let outcome = tokio::task::spawn_blocking(move || monitor.poll_once()).await??;
    match outcome {
        Some(PollOutcome::Progress { done, total }) => {
            let percent = if total == 0 {
                100
            } else {
                ((done as f64 / total as f64) * 100.0).round() as u8
            };
            println!("in progress: {} / {} bytes ({}%)", done, total, percent);
        }
        Some(PollOutcome::Complete) => println!("complete"),
        Some(PollOutcome::Cancelled) => println!("cancelled"),
        Some(PollOutcome::UnknownPid) => println!("unknown process id"),
        None => println!("monitor returned no status"),
    }
    Ok(())
}
