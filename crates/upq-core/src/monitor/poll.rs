//! Scheduled poll loop: one timer tick, one poll, repeat while told to.
//!
//! The loop owns the timer; the decision to keep polling is made by the
//! outcome consumer via [`PollControl`]. The enabled token provides
//! cooperative cancellation between ticks, so tearing down a frame never
//! leaves a timer behind for longer than one interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{PollControl, PollOutcome, TransferMonitor};

/// One scheduled polling task for one in-flight upload.
pub struct PollTask {
    pub monitor: TransferMonitor,
    pub interval: Duration,
    /// Cleared when the frame stops polling; checked before every poll.
    pub enabled: Arc<AtomicBool>,
}

/// Runs the poll loop until the consumer returns [`PollControl::Stop`], the
/// enabled token clears, or the poll task fails to schedule. Transient poll
/// failures (curl errors, non-success HTTP statuses) are dropped and the loop
/// simply tries again on its normal schedule.
pub async fn run_poll_loop<F>(task: PollTask, mut on_outcome: F)
where
    F: FnMut(PollOutcome) -> PollControl + Send + 'static,
{
    loop {
        tokio::time::sleep(task.interval).await;
        if !task.enabled.load(Ordering::Relaxed) {
            return;
        }

        let monitor = task.monitor.clone();
        let polled = tokio::task::spawn_blocking(move || monitor.poll_once()).await;
        let outcome = match polled {
            Ok(Ok(Some(outcome))) => outcome,
            Ok(Ok(None)) => continue,
            Ok(Err(err)) => {
                tracing::debug!("monitor poll failed, retrying on schedule: {:#}", err);
                continue;
            }
            Err(join_err) => {
                tracing::warn!("monitor poll task join failed: {}", join_err);
                return;
            }
        };

        // The frame may have been torn down while the poll was in flight.
        if !task.enabled.load(Ordering::Relaxed) {
            return;
        }

        match on_outcome(outcome) {
            PollControl::Continue => {}
            PollControl::Stop => return,
        }
    }
}
