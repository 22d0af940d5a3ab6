//! onion-keeper library crate
//!
//! Keeps a Tor onion service and its client authorization registered
//! through Tor's control port.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface (run, reset, client-auth, keygen)
//! - [`config`] - Configuration loading and validation
//! - [`crypto`] - x25519 client auth key generation
//! - [`tor`] - Control port channel, command grammar, reply parsing
//! - [`state`] - Desired state model and the config provider seam
//! - [`service`] - Onion service façade and startup reconciliation
//! - [`scheduler`] - Delayed one-shot reconciliation task

#![allow(clippy::doc_markdown)] // Doc formatting is secondary
#![allow(clippy::uninlined_format_args)] // Format string style preference
#![allow(clippy::module_name_repetitions)] // ControlError in tor::error reads fine

pub mod cli;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod tor;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
