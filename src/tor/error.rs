//! Control port error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the Tor control port
#[derive(Debug, Error)]
pub enum ControlError {
    /// Control port unreachable
    #[error("failed to connect to Tor control port at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Tor rejected our credentials
    #[error("Tor control port authentication failed: {0}")]
    Authentication(String),

    #[error("control connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tor closed the connection before a complete reply arrived
    #[error("control connection closed by Tor")]
    Closed,

    #[error("no complete reply from Tor within {0:?}")]
    Timeout(Duration),

    /// Reply was well formed but its status is not an accepted one
    #[error("{command} rejected by Tor: {reply}")]
    Protocol { command: String, reply: String },

    /// Reply did not follow the expected grammar
    #[error("malformed control reply: {0}")]
    Parse(String),

    /// A command builder refused its input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ControlError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for failures that leave the control connection unusable
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Authentication(_) | Self::Io(_) | Self::Closed
        )
    }
}
