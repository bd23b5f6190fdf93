//! # credbridge-client -- Typed clients for the bridge's collaborators
//!
//! The bridge talks to exactly two systems outside its own process:
//!
//! - **The credential registry**, an EVM contract reached over Ethereum
//!   JSON-RPC. [`registry::CredentialLedger`] is the facade the issuance
//!   correlator writes through; [`registry::RpcRegistry`] is the production
//!   implementation and [`registry::InMemoryRegistry`] backs tests and local
//!   development.
//! - **The door endpoint**, a single HTTP GET that opens a physical access
//!   point once a wallet presentation has been verified. See [`door`].
//!
//! ## Architecture
//!
//! This crate is the only path by which the bridge performs outbound I/O.
//! Route handlers and the correlator depend on the traits, never on
//! `reqwest` directly.

pub mod config;
pub mod door;
pub mod error;
pub mod registry;
pub(crate) mod retry;

pub use config::{ConfigError, DoorConfig, RegistryConfig};
pub use door::{DoorAction, DoorResponse, HttpDoorClient};
pub use error::ClientError;
pub use registry::{
    CredentialLedger, InMemoryRegistry, OnchainCredential, RegistryEvent, RpcRegistry,
    StoreCredentialRequest, TxReceipt,
};

use std::time::Duration;

/// Build the shared `reqwest` client used by every collaborator client.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ClientError::Http {
            endpoint: "client_init".into(),
            source: e,
        })
}
