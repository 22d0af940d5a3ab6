//! TOML state file
//!
//! ```toml
//! authorized_clients = ["<x25519 public key, base32>"]
//!
//! [identity]
//! key_type = "ED25519-V3"
//! private_key = "..."
//! public_address = "....onion"
//!
//! [client_auth]
//! public_key_base32 = "..."
//! private_key_base64 = "..."
//!
//! [remote_client_auth]
//! "remoteaddress.onion" = "<x25519 private key, base64>"
//! ```
//!
//! The lists are edited by the operator; `save` only replaces `identity`
//! and `client_auth`.

use super::model::{ClientAuthKeypair, OnionIdentity, OnionServiceDesiredConfig, ProvisionRecord};
use super::OnionConfigProvider;
use crate::config::ServiceConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// On-disk layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub authorized_clients: Vec<String>,
    pub identity: Option<OnionIdentity>,
    pub client_auth: Option<ClientAuthKeypair>,
    #[serde(default)]
    pub remote_client_auth: BTreeMap<String, String>,
}

/// File-backed config provider
pub struct StateFile {
    path: PathBuf,
    onion_port: u16,
    target: String,
    // Serializes read-modify-write in save
    write_lock: Mutex<()>,
}

impl StateFile {
    pub fn new(service: &ServiceConfig) -> Self {
        Self {
            path: service.state_path.clone(),
            onion_port: service.onion_port,
            target: service.target.clone(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file; a missing file is an empty state
    pub fn read(&self) -> Result<PersistedState> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}", self.path.display());
                return Ok(PersistedState::default());
            },
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read state file: {}", self.path.display())
                })
            },
        };

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }

    /// Write via a temp file in the same directory, then rename over the
    /// old file
    pub fn write(&self, state: &PersistedState) -> Result<()> {
        let contents = toml::to_string_pretty(state).context("Failed to serialize state")?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.toml".to_string());
        let tmp = dir.join(format!(".{}.tmp", file_name));

        {
            let mut file = create_private(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

impl OnionConfigProvider for StateFile {
    fn load(&self) -> Result<OnionServiceDesiredConfig> {
        let state = self.read()?;
        Ok(OnionServiceDesiredConfig {
            onion_port: self.onion_port,
            map_to_host_and_port: self.target.clone(),
            existing: state.identity,
            client_auth_public_keys: state.authorized_clients,
            remote_client_auth: state.remote_client_auth,
        })
    }

    fn save(&self, record: &ProvisionRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("state file lock poisoned"))?;

        let mut state = self.read()?;
        state.identity = Some(record.identity.clone());
        state.client_auth = Some(record.client_auth.clone());
        self.write(&state)?;

        info!(
            "Saved identity for {} to {}",
            record.identity.public_address,
            self.path.display()
        );
        Ok(())
    }
}

/// State holds private keys: owner-only permissions where supported
#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::File::create(path)
}
