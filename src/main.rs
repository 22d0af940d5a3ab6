//! onion-keeper - keeps a Tor onion service registered across Tor restarts
//!
//! Tor drops `ADD_ONION` services whenever the daemon restarts. onion-keeper
//! provisions the service identity once, persists it, and re-registers it
//! (with its client authorization entries) every time it starts.
//!
//! # Usage
//!
//! ```bash
//! # Run the daemon
//! onion-keeper --config /etc/onion-keeper/config.toml run
//!
//! # Re-register now, e.g. after restarting Tor
//! onion-keeper reset
//!
//! # Generate a client auth keypair
//! onion-keeper keygen
//! ```

use anyhow::Result;
use clap::Parser;
use onion_keeper::cli::{self, Cli, Commands};
use onion_keeper::{config, logging};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    logging::init(log_level);

    if let Commands::Keygen = &cli.command {
        return cli::run_keygen();
    }

    let config = config::load_from_path(&cli.config)?;

    match &cli.command {
        Commands::Run => cli::run_daemon(&config).await?,
        Commands::Reset => cli::run_reset(&config).await?,
        Commands::Create(args) => cli::run_create(&config, args).await?,
        Commands::Add(args) => cli::run_add(&config, args).await?,
        Commands::Remove(args) => cli::run_remove(&config, args).await?,
        Commands::List => cli::run_list(&config).await?,
        Commands::ClientAuth(args) => cli::run_client_auth(&config, args).await?,
        Commands::Keygen => cli::run_keygen()?,
    }

    Ok(())
}
