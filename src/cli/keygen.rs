//! Keygen command - client auth keypair, no Tor needed

use crate::crypto;
use anyhow::Result;

pub fn run_keygen() -> Result<()> {
    let keys = crypto::generate_client_auth()?;

    println!("Public key (base32):  {}", keys.public_key_base32);
    println!("Private key (base64): {}", keys.private_key_base64);
    println!();
    println!("Service side: add the public key to authorized_clients in the state file.");
    println!("Client side:  onion-keeper client-auth add <address> --key <private key>");
    Ok(())
}
