//! Desired onion service state and its persistence seam
//!
//! The reconciliation engine never touches storage itself; it goes through
//! an [`OnionConfigProvider`].

pub mod file;
pub mod model;

pub use file::StateFile;
pub use model::{
    ClientAuthKeypair, KeyType, OnionIdentity, OnionServiceDesiredConfig, ProvisionRecord,
};

use anyhow::Result;

/// Source of the desired configuration and sink for newly provisioned keys.
///
/// Calls may block; the façade runs them on tokio's blocking pool.
pub trait OnionConfigProvider: Send + Sync {
    /// Read the desired configuration for one reconciliation pass
    fn load(&self) -> Result<OnionServiceDesiredConfig>;

    /// Persist a freshly provisioned identity and client auth keypair
    fn save(&self, record: &ProvisionRecord) -> Result<()>;
}
