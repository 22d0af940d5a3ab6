//! Command-line interface for onion-keeper
//!
//! Provides main commands:
//! - `run` - Daemon: reconcile the onion service shortly after startup
//! - `reset` - Re-register the persisted identity now
//! - `create`, `add`, `remove`, `list` - Direct onion service operations
//! - `client-auth` - Manage client auth for remote services
//! - `keygen` - Generate a client auth keypair (offline)

mod keygen;
mod onion;
mod run;

pub use keygen::run_keygen;
pub use onion::{run_add, run_client_auth, run_create, run_list, run_remove, run_reset};
pub use run::run_daemon;

use crate::config::{self, Config};
use crate::service::OnionServiceManager;
use crate::state::StateFile;
use crate::tor::ControlChannel;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// onion-keeper - keeps a Tor onion service registered across Tor restarts
#[derive(Parser, Debug)]
#[command(name = "onion-keeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = config::file::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the daemon (typically called by systemd)
    Run,

    /// Remove and re-add the persisted onion service and client auth entries
    Reset,

    /// Create a new onion service with a fresh key (not persisted)
    Create(CreateArgs),

    /// Register an onion service from an existing private key
    Add(AddArgs),

    /// Remove an onion service from Tor
    Remove(RemoveArgs),

    /// List detached onion services Tor currently holds
    List,

    /// Manage client authorization for remote onion services
    ClientAuth(ClientAuthArgs),

    /// Generate an x25519 client auth keypair
    Keygen,
}

/// Arguments for create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Virtual port clients connect to
    #[arg(long)]
    pub port: u16,

    /// Local host:port to forward to
    #[arg(long)]
    pub target: String,
}

/// Arguments for add command
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Key type
    #[arg(long, default_value = "ED25519-V3")]
    pub key_type: String,

    /// Private key blob; read from ONION_KEEPER_PRIVATE_KEY when omitted
    #[arg(long, env = "ONION_KEEPER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Virtual port clients connect to
    #[arg(long)]
    pub port: u16,

    /// Local host:port to forward to
    #[arg(long)]
    pub target: String,

    /// Authorized client x25519 public key (base32), repeatable
    #[arg(long = "client-auth")]
    pub client_auth: Vec<String>,
}

/// Arguments for remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Onion address (with or without .onion)
    pub address: String,

    /// Fail if Tor does not know the service
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

/// Arguments for client-auth command
#[derive(Parser, Debug)]
pub struct ClientAuthArgs {
    #[command(subcommand)]
    pub action: ClientAuthAction,
}

/// Client auth subcommands
#[derive(Subcommand, Debug)]
pub enum ClientAuthAction {
    /// Register our x25519 private key for a remote onion service
    Add {
        /// Remote onion address
        address: String,
        /// x25519 private key (base64); read from ONION_KEEPER_CLIENT_KEY when omitted
        #[arg(long, env = "ONION_KEEPER_CLIENT_KEY", hide_env_values = true)]
        key: String,
    },

    /// Forget our key for a remote onion service
    Remove {
        /// Remote onion address
        address: String,
        /// Fail on any non-OK reply
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

/// Load config, connect to Tor and build the façade
pub(crate) async fn connect(config: &Config) -> Result<Arc<OnionServiceManager>> {
    let channel = ControlChannel::connect(&config.tor)
        .await
        .context("Failed to connect to Tor")?;
    let store = StateFile::new(&config.service);

    Ok(Arc::new(OnionServiceManager::new(
        Arc::new(channel),
        Arc::new(store),
    )))
}
