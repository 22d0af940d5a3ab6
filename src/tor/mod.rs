//! Tor daemon interaction
//!
//! Control port connection, command grammar and reply parsing for the
//! onion service and client auth subset of the control protocol.

pub mod commands;
pub mod control;
pub mod error;
pub mod reply;

pub use control::{ControlChannel, ControlTransport};
pub use error::ControlError;
pub use reply::{ControlReply, ReplyLine};
