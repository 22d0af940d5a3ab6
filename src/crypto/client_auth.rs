//! x25519 client authorization keys
//!
//! Tor takes the public half as unpadded base32 (`ClientAuthV3=`) and the
//! private half as base64 (`ONION_CLIENT_AUTH_ADD ... x25519:`).

use crate::state::model::ClientAuthKeypair;
use anyhow::{bail, Context, Result};
use data_encoding::{BASE32_NOPAD, BASE64};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

/// Raw key length before encoding
pub const KEY_LEN: usize = 32;

/// Generate a fresh keypair from the OS CSPRNG
pub fn generate() -> Result<ClientAuthKeypair> {
    let mut private_bytes = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut private_bytes)
        .context("OS entropy source unavailable")?;
    Ok(from_private_bytes(private_bytes))
}

/// Encode a keypair from raw private key bytes
pub fn from_private_bytes(private_bytes: [u8; KEY_LEN]) -> ClientAuthKeypair {
    let secret = StaticSecret::from(private_bytes);
    let public = PublicKey::from(&secret);

    ClientAuthKeypair {
        public_key_base32: BASE32_NOPAD.encode(public.as_bytes()),
        private_key_base64: BASE64.encode(&private_bytes),
    }
}

/// Derive the base32 public key for a base64 private key
pub fn public_key_for(private_key_base64: &str) -> Result<String> {
    let bytes = BASE64
        .decode(private_key_base64.as_bytes())
        .context("x25519 private key is not valid base64")?;
    let Ok(raw) = <[u8; KEY_LEN]>::try_from(bytes.as_slice()) else {
        bail!(
            "x25519 private key must be {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        );
    };
    Ok(from_private_bytes(raw).public_key_base32)
}
