//! Onion service management façade
//!
//! Each operation is one command/reply exchange on the shared control
//! channel. Concurrent callers queue behind each other on the channel.

use super::error::{Result, ServiceError};
use crate::crypto;
use crate::state::{
    ClientAuthKeypair, KeyType, OnionConfigProvider, OnionIdentity, OnionServiceDesiredConfig,
    ProvisionRecord,
};
use crate::tor::{commands, ControlError, ControlReply, ControlTransport};
use anyhow::anyhow;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Source of client auth keypairs
pub type Keygen = Arc<dyn Fn() -> anyhow::Result<ClientAuthKeypair> + Send + Sync>;

pub struct OnionServiceManager {
    transport: Arc<dyn ControlTransport>,
    provider: Arc<dyn OnionConfigProvider>,
    keygen: Keygen,
}

impl OnionServiceManager {
    pub fn new(transport: Arc<dyn ControlTransport>, provider: Arc<dyn OnionConfigProvider>) -> Self {
        Self {
            transport,
            provider,
            keygen: Arc::new(crypto::generate_client_auth),
        }
    }

    /// Replace the OS-entropy keypair generator
    pub fn with_keygen(mut self, keygen: Keygen) -> Self {
        self.keygen = keygen;
        self
    }

    /// Load the desired config on the blocking pool; providers may touch disk
    pub async fn load_config(&self) -> Result<OnionServiceDesiredConfig> {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || provider.load())
            .await
            .map_err(|e| ServiceError::Store(anyhow!("config load task failed: {}", e)))?
            .map_err(ServiceError::Store)
    }

    async fn save_record(&self, record: &ProvisionRecord) -> Result<()> {
        let provider = Arc::clone(&self.provider);
        let record = record.clone();
        tokio::task::spawn_blocking(move || provider.save(&record))
            .await
            .map_err(|e| ServiceError::Store(anyhow!("config save task failed: {}", e)))?
            .map_err(ServiceError::Store)
    }

    async fn exchange(&self, command: &str) -> std::result::Result<ControlReply, ControlError> {
        self.transport.send_command(command).await
    }

    /// Create a brand new onion service and return the identity Tor generated
    pub async fn create_onion(
        &self,
        onion_port: u16,
        target: &str,
    ) -> std::result::Result<OnionIdentity, ControlError> {
        let cmd = commands::add_onion_new(onion_port, target)?;
        let reply = self.exchange(&cmd).await?;

        match commands::parse_add_onion_new(&reply) {
            Ok(identity) => {
                info!(
                    "Created onion service {} ({}) -> {}",
                    identity.public_address, identity.key_type, target
                );
                Ok(identity)
            },
            Err(e) => {
                error!("ADD_ONION NEW failed: {}", e);
                Err(e)
            },
        }
    }

    /// `DEL_ONION`; with `ignore_unknown` an unknown service is not an error
    pub async fn remove_onion(
        &self,
        public_address: &str,
        ignore_unknown: bool,
    ) -> std::result::Result<(), ControlError> {
        let cmd = commands::del_onion(public_address)?;
        let reply = self.exchange(&cmd).await?;

        commands::check_del_onion(&reply, ignore_unknown).map_err(|e| {
            error!("DEL_ONION {} failed: {}", public_address, e);
            e
        })?;
        debug!("DEL_ONION {}: {}", public_address, reply);
        Ok(())
    }

    /// Register an onion service from a known private key
    pub async fn add_onion(
        &self,
        key_type: KeyType,
        private_key: &str,
        onion_port: u16,
        target: &str,
        client_auth_public_keys: &[String],
    ) -> std::result::Result<(), ControlError> {
        let cmd = commands::add_onion_existing(
            key_type,
            private_key,
            onion_port,
            target,
            client_auth_public_keys,
        )?;
        let reply = self.exchange(&cmd).await?;

        commands::expect_ok("ADD_ONION", &reply).map_err(|e| {
            error!("ADD_ONION failed: {}", e);
            e
        })?;
        debug!("ADD_ONION: {}", reply);
        Ok(())
    }

    /// Give Tor our x25519 key for a remote service that requires client auth
    pub async fn client_auth_add(
        &self,
        public_address: &str,
        x25519_private_key_base64: &str,
    ) -> std::result::Result<(), ControlError> {
        let cmd = commands::client_auth_add(public_address, x25519_private_key_base64)?;
        let reply = self.exchange(&cmd).await?;

        commands::expect_ok("ONION_CLIENT_AUTH_ADD", &reply).map_err(|e| {
            error!("ONION_CLIENT_AUTH_ADD {} failed: {}", public_address, e);
            e
        })?;
        debug!("ONION_CLIENT_AUTH_ADD {}: {}", public_address, reply);
        Ok(())
    }

    /// Forget our client auth key for a remote service.
    ///
    /// With `ignore_unknown` every failure is tolerated and only logged.
    pub async fn client_auth_remove(
        &self,
        public_address: &str,
        ignore_unknown: bool,
    ) -> std::result::Result<(), ControlError> {
        let cmd = commands::client_auth_remove(public_address)?;
        let reply = self.exchange(&cmd).await?;

        match commands::check_client_auth_remove(&reply, ignore_unknown) {
            Ok(true) => {
                debug!("ONION_CLIENT_AUTH_REMOVE {}: {}", public_address, reply);
                Ok(())
            },
            Ok(false) => {
                warn!(
                    "ONION_CLIENT_AUTH_REMOVE {} ignored failure: {}",
                    public_address, reply
                );
                Ok(())
            },
            Err(e) => {
                error!("ONION_CLIENT_AUTH_REMOVE {} failed: {}", public_address, e);
                Err(e)
            },
        }
    }

    pub fn generate_client_auth_keypair(&self) -> Result<ClientAuthKeypair> {
        (self.keygen)().map_err(ServiceError::KeyGeneration)
    }

    /// `SIGNAL NEWNYM`, used at startup to prove the control port works
    pub async fn new_circuits(&self) -> std::result::Result<(), ControlError> {
        let reply = self.exchange(commands::SIGNAL_NEWNYM).await?;
        commands::expect_ok("SIGNAL", &reply)
    }

    /// Service ids Tor currently holds with `Flags=Detach`
    pub async fn list_detached(&self) -> std::result::Result<Vec<String>, ControlError> {
        let reply = self.exchange(commands::GETINFO_DETACHED).await?;
        commands::parse_detached(&reply)
    }

    /// First-ever start: create the service, generate client auth keys and
    /// persist both
    pub async fn provision(&self, config: &OnionServiceDesiredConfig) -> Result<ProvisionRecord> {
        let identity = self
            .create_onion(config.onion_port, &config.map_to_host_and_port)
            .await?;

        let client_auth = self.generate_client_auth_keypair()?;
        info!(
            "Generated client auth keypair, public key {}",
            client_auth.public_key_base32
        );

        let record = ProvisionRecord {
            identity,
            client_auth,
        };
        self.save_record(&record).await?;
        Ok(record)
    }

    /// Re-apply a persisted identity to a Tor that may or may not still
    /// hold it, then resync remote client auth entries
    pub async fn restore(
        &self,
        config: &OnionServiceDesiredConfig,
        identity: &OnionIdentity,
    ) -> Result<()> {
        self.remove_onion(&identity.public_address, true).await?;
        self.add_onion(
            identity.key_type,
            &identity.private_key,
            config.onion_port,
            &config.map_to_host_and_port,
            &config.client_auth_public_keys,
        )
        .await?;

        // Tor refuses to add an entry over an existing one
        for (address, key) in &config.remote_client_auth {
            self.client_auth_remove(address, true).await?;
            self.client_auth_add(address, key).await?;
            info!("Client auth registered for {}", address);
        }

        info!(
            "{}:{} registered to {}, {} authorized client(s)",
            identity.public_address,
            config.onion_port,
            config.map_to_host_and_port,
            config.client_auth_public_keys.len()
        );
        Ok(())
    }

    /// Re-register the persisted identity on demand. Safe to repeat.
    pub async fn reset_registration(&self) -> Result<()> {
        let config = self.load_config().await?;
        let identity = config.existing.as_ref().ok_or(ServiceError::NotProvisioned)?;
        self.restore(&config, identity).await
    }
}
