//! Daemon mode

use crate::config::Config;
use crate::scheduler;
use crate::service::{OnionServiceManager, ReconcileEngine, ReconcileState};
use crate::state::StateFile;
use crate::tor::ControlChannel;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Connect, schedule the startup reconciliation, run until Ctrl-C
pub async fn run_daemon(config: &Config) -> Result<()> {
    info!("onion-keeper v{} starting", crate::VERSION);

    // Connection or auth failure is fatal to startup
    let channel = Arc::new(
        ControlChannel::connect(&config.tor)
            .await
            .context("Failed to connect to Tor")?,
    );
    let store = Arc::new(StateFile::new(&config.service));
    let manager = Arc::new(OnionServiceManager::new(channel.clone(), store));

    manager
        .new_circuits()
        .await
        .context("Tor control port is not answering commands")?;
    info!("Tor control port ready");

    let engine = Arc::new(ReconcileEngine::new(manager));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match scheduler::run_until(engine, config.schedule.startup_delay(), shutdown).await {
        Some(ReconcileState::Applied(applied)) => info!("Reconciliation result: {:?}", applied),
        Some(ReconcileState::Failed(reason)) => warn!("Reconciliation had failed: {}", reason),
        Some(other) => warn!("Reconciliation ended in state {:?}", other),
        None => info!("Reconciliation did not run"),
    }

    channel.close().await;
    info!("onion-keeper stopped");
    Ok(())
}
