//! Delayed one-shot reconciliation

use crate::service::{ReconcileEngine, ReconcileState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A reconciliation pass waiting for its start delay, or already running.
///
/// Fires at most once. Dropping the handle does not cancel it.
pub struct ScheduledPass {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Option<ReconcileState>>,
}

impl ScheduledPass {
    pub fn spawn(engine: Arc<ReconcileEngine>, delay: Duration) -> Self {
        let (cancel, cancelled) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                // A dropped sender resolves to Err and does not match
                Ok(()) = cancelled => {
                    info!("Scheduled reconciliation cancelled before it started");
                    None
                },
                () = tokio::time::sleep(delay) => {
                    debug!("Start delay of {:?} elapsed, reconciling", delay);
                    Some(engine.run_pass().await)
                },
            }
        });

        Self {
            cancel: Some(cancel),
            handle,
        }
    }

    /// Cancel the pass if it has not fired yet. A pass already in progress
    /// runs to completion.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // Err means the task already finished
            let _ = cancel.send(());
        }
    }

    /// Wait for the task. `None` when it was cancelled before firing.
    pub async fn wait(self) -> Option<ReconcileState> {
        match self.handle.await {
            Ok(state) => state,
            Err(e) => {
                warn!("Reconciliation task aborted: {}", e);
                None
            },
        }
    }
}
