//! Façade error type

use crate::tor::ControlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Control(#[from] ControlError),

    /// Reset requested before any identity was provisioned
    #[error("no onion identity has been provisioned yet")]
    NotProvisioned,

    #[error("client auth key generation failed: {0:#}")]
    KeyGeneration(#[source] anyhow::Error),

    /// Config provider failed to load or save
    #[error("onion config store: {0:#}")]
    Store(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
