//! Key generation for onion client authorization
//!
//! No IO here.

pub mod client_auth;

pub use client_auth::generate as generate_client_auth;
