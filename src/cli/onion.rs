//! On-demand onion service commands

use super::{connect, AddArgs, ClientAuthAction, ClientAuthArgs, CreateArgs, RemoveArgs};
use crate::config::Config;
use crate::state::KeyType;
use anyhow::{anyhow, Result};

/// Re-register the persisted identity
pub async fn run_reset(config: &Config) -> Result<()> {
    let manager = connect(config).await?;
    manager.reset_registration().await?;
    println!("Onion service registration reset");
    Ok(())
}

/// Create a new service. The key is printed, not persisted.
pub async fn run_create(config: &Config, args: &CreateArgs) -> Result<()> {
    let manager = connect(config).await?;
    let identity = manager.create_onion(args.port, &args.target).await?;

    println!("Address:     {}", identity.public_address);
    println!("Key type:    {}", identity.key_type);
    println!("Private key: {}", identity.private_key);
    Ok(())
}

pub async fn run_add(config: &Config, args: &AddArgs) -> Result<()> {
    let key_type: KeyType = args.key_type.parse().map_err(|e: String| anyhow!(e))?;
    let manager = connect(config).await?;
    manager
        .add_onion(
            key_type,
            &args.private_key,
            args.port,
            &args.target,
            &args.client_auth,
        )
        .await?;
    println!("Onion service registered");
    Ok(())
}

pub async fn run_remove(config: &Config, args: &RemoveArgs) -> Result<()> {
    let manager = connect(config).await?;
    manager.remove_onion(&args.address, !args.strict).await?;
    println!("Removed {}", args.address);
    Ok(())
}

pub async fn run_list(config: &Config) -> Result<()> {
    let manager = connect(config).await?;
    let services = manager.list_detached().await?;

    if services.is_empty() {
        println!("No detached onion services");
    }
    for id in services {
        println!("{}.onion", id);
    }
    Ok(())
}

pub async fn run_client_auth(config: &Config, args: &ClientAuthArgs) -> Result<()> {
    let manager = connect(config).await?;
    match &args.action {
        ClientAuthAction::Add { address, key } => {
            manager.client_auth_add(address, key).await?;
            println!("Client auth added for {}", address);
        },
        ClientAuthAction::Remove { address, strict } => {
            manager.client_auth_remove(address, !strict).await?;
            println!("Client auth removed for {}", address);
        },
    }
    Ok(())
}
