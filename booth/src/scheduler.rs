use crate::pipeline::{CapturePipeline, FireTrigger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a user-initiated capture, for the presentation side to surface
/// once per action.
#[derive(Debug)]
pub enum CaptureEvent {
    Sent { message_id: Option<i64> },
    Failed { reason: String },
}

/// Handle for a running auto-send loop. Dropping it cancels future fires;
/// fires already in flight run to completion.
pub struct AutoSendTimer {
    interval: Duration,
    handle: JoinHandle<()>,
}

impl AutoSendTimer {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for AutoSendTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drives the capture pipeline: once per user action, or repeatedly on a
/// fixed interval. Owns the single auto-send timer.
pub struct Scheduler<P: CapturePipeline> {
    pipeline: Arc<P>,
    events: mpsc::UnboundedSender<CaptureEvent>,
    auto_send: Option<AutoSendTimer>,
}

impl<P: CapturePipeline> Scheduler<P> {
    pub fn new(pipeline: Arc<P>) -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                pipeline,
                events,
                auto_send: None,
            },
            rx,
        )
    }

    /// Fire the pipeline once, independently of any running auto-send. The
    /// outcome comes back as a single `CaptureEvent`.
    pub fn capture_once(&self) {
        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match pipeline.fire(FireTrigger::Manual).await {
                Ok(ack) => CaptureEvent::Sent {
                    message_id: ack.message_id,
                },
                Err(e) => CaptureEvent::Failed {
                    reason: e.to_string(),
                },
            };
            let _ = events.send(event);
        });
    }

    /// Install the auto-send loop. Any previously running timer is cancelled
    /// first, so at most one exists and a tick never double-fires. The first
    /// fire happens one full interval after this call.
    pub fn start_auto_send(&mut self, interval: Duration) {
        self.stop_auto_send();
        let pipeline = Arc::clone(&self.pipeline);
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                let pipeline = Arc::clone(&pipeline);
                // Each fire is its own task: a slow or failing delivery never
                // delays the schedule, and cancelling the timer never aborts
                // a send already underway.
                tokio::spawn(async move {
                    match pipeline.fire(FireTrigger::AutoSend).await {
                        Ok(ack) => debug!(message_id = ?ack.message_id, "auto-send delivered"),
                        Err(e) => warn!(error = %e, "auto-send fire failed"),
                    }
                });
            }
        });
        info!(interval_ms = interval.as_millis() as u64, "auto-send started");
        self.auto_send = Some(AutoSendTimer { interval, handle });
    }

    /// Cancel future auto-send fires. In-flight deliveries are not aborted.
    pub fn stop_auto_send(&mut self) {
        if let Some(timer) = self.auto_send.take() {
            timer.cancel();
            info!("auto-send stopped");
        }
    }

    pub fn auto_send(&self) -> Option<&AutoSendTimer> {
        self.auto_send.as_ref()
    }
}
