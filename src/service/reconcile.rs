//! Startup reconciliation
//!
//! Tor forgets `ADD_ONION` services when it restarts. A pass either
//! provisions a brand new identity (nothing persisted yet) or re-registers
//! the persisted one against the running Tor.
//!
//! `Idle -> Loading -> Provisioning | Restoring -> Applied | Failed`
//!
//! The latest state is kept in a `watch` channel. Every transition is also
//! sent on a `broadcast` channel, since `watch` only holds the newest value
//! and `Loading` is usually overwritten before a watcher looks.

use super::error::Result;
use super::manager::OnionServiceManager;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

/// What a successful pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Provisioned { public_address: String },
    Restored { public_address: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    Loading,
    Provisioning,
    Restoring,
    Applied(Applied),
    Failed(String),
}

impl ReconcileState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Applied(_) | Self::Failed(_))
    }
}

/// A pass makes three transitions
const TRANSITION_BUFFER: usize = 16;

pub struct ReconcileEngine {
    manager: Arc<OnionServiceManager>,
    state: watch::Sender<ReconcileState>,
    transitions: broadcast::Sender<ReconcileState>,
}

impl ReconcileEngine {
    pub fn new(manager: Arc<OnionServiceManager>) -> Self {
        let (state, _) = watch::channel(ReconcileState::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            manager,
            state,
            transitions,
        }
    }

    /// Current state
    pub fn state(&self) -> ReconcileState {
        self.state.borrow().clone()
    }

    /// Every transition made after this call, in order
    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileState> {
        self.transitions.subscribe()
    }

    fn transition(&self, next: ReconcileState) {
        debug!("Reconcile state -> {:?}", next);
        // Err only means nobody is subscribed
        let _ = self.transitions.send(next.clone());
        self.state.send_replace(next);
    }

    /// Run one pass, propagating the first error
    pub async fn reconcile(&self) -> Result<Applied> {
        let result = self.drive().await;
        match &result {
            Ok(applied) => self.transition(ReconcileState::Applied(applied.clone())),
            Err(e) => self.transition(ReconcileState::Failed(e.to_string())),
        }
        result
    }

    async fn drive(&self) -> Result<Applied> {
        self.transition(ReconcileState::Loading);
        info!("Loading onion service configuration");
        let config = self.manager.load_config().await?;

        match &config.existing {
            None => {
                self.transition(ReconcileState::Provisioning);
                info!("No onion identity found, provisioning a new one");
                let record = self.manager.provision(&config).await?;
                Ok(Applied::Provisioned {
                    public_address: record.identity.public_address,
                })
            },
            Some(identity) => {
                self.transition(ReconcileState::Restoring);
                info!("Configuration for {} found, re-registering", identity.public_address);
                self.manager.restore(&config, identity).await?;
                Ok(Applied::Restored {
                    public_address: identity.public_address.clone(),
                })
            },
        }
    }

    /// Run one pass for a background schedule: errors are logged, never
    /// propagated or retried
    pub async fn run_pass(&self) -> ReconcileState {
        if let Err(e) = self.reconcile().await {
            error!("Onion service reconciliation failed: {}", e);
        }
        self.state()
    }
}
