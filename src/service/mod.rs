//! Onion service lifecycle
//!
//! [`OnionServiceManager`] exposes the individual control operations,
//! [`ReconcileEngine`] drives them to match persisted state at startup.

pub mod error;
pub mod manager;
pub mod reconcile;

pub use error::ServiceError;
pub use manager::{Keygen, OnionServiceManager};
pub use reconcile::{Applied, ReconcileEngine, ReconcileState};
