//! Onion service state model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Suffix Tor appends to a service id to form the public address
pub const ONION_SUFFIX: &str = ".onion";

/// Onion service key type. The private key encoding is tied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "ED25519-V3")]
    Ed25519V3,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519V3 => "ED25519-V3",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ED25519-V3" => Ok(Self::Ed25519V3),
            other => Err(format!("unsupported onion key type {:?}", other)),
        }
    }
}

/// A provisioned onion identity
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnionIdentity {
    pub key_type: KeyType,
    /// Key blob exactly as Tor returned it after `{key_type}:`
    pub private_key: String,
    /// Service id with `.onion` appended
    pub public_address: String,
}

impl OnionIdentity {
    /// Service id without the `.onion` suffix
    pub fn service_id(&self) -> &str {
        self.public_address
            .strip_suffix(ONION_SUFFIX)
            .unwrap_or(&self.public_address)
    }
}

// Keeps key material out of logs
impl fmt::Debug for OnionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnionIdentity")
            .field("key_type", &self.key_type)
            .field("private_key", &"<redacted>")
            .field("public_address", &self.public_address)
            .finish()
    }
}

/// x25519 client authorization keypair in control-protocol encodings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAuthKeypair {
    /// Unpadded base32 of the 32-byte public key
    pub public_key_base32: String,
    /// Standard base64 of the 32-byte private key
    pub private_key_base64: String,
}

impl fmt::Debug for ClientAuthKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientAuthKeypair")
            .field("public_key_base32", &self.public_key_base32)
            .field("private_key_base64", &"<redacted>")
            .finish()
    }
}

/// Desired registration, read once per reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnionServiceDesiredConfig {
    pub onion_port: u16,
    /// `host:port` connections are forwarded to
    pub map_to_host_and_port: String,
    pub existing: Option<OnionIdentity>,
    /// x25519 public keys (base32) allowed to reach our service
    pub client_auth_public_keys: Vec<String>,
    /// Remote onion address -> our x25519 private key (base64) for it
    pub remote_client_auth: BTreeMap<String, String>,
}

/// Everything persisted after a fresh identity has been provisioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRecord {
    pub identity: OnionIdentity,
    pub client_auth: ClientAuthKeypair,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_roundtrip() {
        let kt: KeyType = "ED25519-V3".parse().unwrap();
        assert_eq!(kt, KeyType::Ed25519V3);
        assert_eq!(kt.to_string(), "ED25519-V3");
        assert!("RSA1024".parse::<KeyType>().is_err());
        assert!("ed25519-v3".parse::<KeyType>().is_err());
    }

    #[test]
    fn test_service_id_strips_suffix() {
        let identity = OnionIdentity {
            key_type: KeyType::Ed25519V3,
            private_key: "secret".to_string(),
            public_address: "abc123.onion".to_string(),
        };
        assert_eq!(identity.service_id(), "abc123");
    }

    #[test]
    fn test_debug_redacts_keys() {
        let identity = OnionIdentity {
            key_type: KeyType::Ed25519V3,
            private_key: "supersecret".to_string(),
            public_address: "abc123.onion".to_string(),
        };
        let keys = ClientAuthKeypair {
            public_key_base32: "PUB".to_string(),
            private_key_base64: "alsosecret".to_string(),
        };
        assert!(!format!("{:?}", identity).contains("supersecret"));
        assert!(!format!("{:?}", keys).contains("alsosecret"));
        assert!(format!("{:?}", keys).contains("PUB"));
    }
}
