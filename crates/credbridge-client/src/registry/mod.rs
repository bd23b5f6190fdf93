//! # Credential Registry Facade
//!
//! The registry is an EVM contract with a fixed surface:
//!
//! | Kind | Signature |
//! |------|-----------|
//! | event | `CredentialStored(bytes32 indexed credentialHash, string metadata)` |
//! | event | `CredentialStatusChanged(bytes32 indexed credentialHash, bool active)` |
//! | write | `storeCredential(bytes32,string,string,string,string)` |
//! | write | `setCredentialStatus(bytes32,bool)` |
//! | view  | `getCredential(bytes32) → (string,string,string,string,bool)` |
//! | view  | `metadataOf(bytes32) → string` |
//! | view  | `exists(bytes32) → bool` |
//! | view  | `isActive(bytes32) → bool` |
//! | view  | `credentialsOfSubject(string) → bytes32[]` |
//!
//! The bridge assumes nothing of the contract beyond "write once, read back":
//! [`CredentialLedger::store_credential`] is not assumed idempotent, so the
//! caller is responsible for calling it at most once per credential.

pub mod abi;
mod memory;
mod rlp;
mod rpc;
mod signer;

pub use memory::InMemoryRegistry;
pub use rpc::RpcRegistry;
pub use signer::{LegacyTransaction, TransactionSigner};

use std::fmt;

use async_trait::async_trait;
use credbridge_core::CredentialHash;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A 20-byte EVM account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Wrap raw address bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse `0x` followed by 40 hex characters (checksum casing is accepted
    /// but not verified).
    pub fn parse(raw: &str) -> Result<Self, abi::AbiError> {
        let bytes = abi::decode_hex(raw)?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|_| abi::AbiError::InvalidHex(raw.to_string()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&abi::encode_hex(&self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Arguments to `storeCredential`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCredentialRequest {
    pub credential_hash: CredentialHash,
    /// Serialized metadata object, stored verbatim.
    pub metadata: String,
    pub subject_did: String,
    /// Empty when the issuer could not be determined.
    pub issuer_name: String,
    /// Empty when the issuer DID could not be determined.
    pub issuer_did: String,
}

/// A decoded registry event from a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RegistryEvent {
    #[serde(rename_all = "camelCase")]
    CredentialStored { credential_hash: CredentialHash },
    #[serde(rename_all = "camelCase")]
    CredentialStatusChanged {
        credential_hash: CredentialHash,
        active: bool,
    },
}

/// Outcome of a mined registry transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    /// Registry events emitted by the transaction.
    pub events: Vec<RegistryEvent>,
}

/// A credential as read back from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainCredential {
    pub metadata: String,
    pub subject_did: String,
    pub issuer_name: String,
    pub issuer_did: String,
    pub active: bool,
}

/// The ledger-write facade used by the issuance correlator and the status
/// endpoint.
#[async_trait]
pub trait CredentialLedger: Send + Sync + fmt::Debug {
    /// Submit `storeCredential` and wait for it to be mined.
    async fn store_credential(
        &self,
        request: &StoreCredentialRequest,
    ) -> Result<TxReceipt, ClientError>;

    /// Submit `setCredentialStatus` and wait for it to be mined.
    async fn set_credential_status(
        &self,
        credential_hash: &CredentialHash,
        active: bool,
    ) -> Result<TxReceipt, ClientError>;

    /// Read `getCredential`. `None` when the registry has no such credential.
    async fn get_credential(
        &self,
        credential_hash: &CredentialHash,
    ) -> Result<Option<OnchainCredential>, ClientError>;

    /// Read `metadataOf`.
    async fn metadata_of(&self, credential_hash: &CredentialHash) -> Result<String, ClientError>;

    /// Read `exists`.
    async fn exists(&self, credential_hash: &CredentialHash) -> Result<bool, ClientError>;

    /// Read `isActive`.
    async fn is_active(&self, credential_hash: &CredentialHash) -> Result<bool, ClientError>;

    /// Read `credentialsOfSubject`.
    async fn credentials_of_subject(
        &self,
        subject_did: &str,
    ) -> Result<Vec<CredentialHash>, ClientError>;

    /// The account that signs registry writes.
    async fn signer_address(&self) -> Result<Address, ClientError>;

    /// The registry contract address.
    fn registry_address(&self) -> Address;

    /// Where the registry is reached (RPC URL, or a label for in-process
    /// registries).
    fn endpoint(&self) -> String;
}
