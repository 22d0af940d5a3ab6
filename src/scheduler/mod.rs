//! Task scheduling
//!
//! All tokio::spawn calls live here.

mod startup;

pub use startup::ScheduledPass;

use crate::service::{ReconcileEngine, ReconcileState};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Schedule the startup pass, then wait for `shutdown`.
///
/// A pass that has not fired by shutdown is cancelled; one in progress is
/// allowed to finish.
pub async fn run_until<F>(
    engine: Arc<ReconcileEngine>,
    delay: Duration,
    shutdown: F,
) -> Option<ReconcileState>
where
    F: Future<Output = ()>,
{
    let mut pass = ScheduledPass::spawn(engine, delay);
    info!("Onion service reconciliation scheduled in {:?}", delay);

    shutdown.await;
    info!("Shutdown requested");

    pass.cancel();
    pass.wait().await
}
