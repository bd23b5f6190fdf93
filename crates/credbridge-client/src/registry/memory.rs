//! In-process [`CredentialLedger`] for tests and local development.
//!
//! Mirrors the registry contract's observable behavior: a second
//! `storeCredential` for the same hash reverts, status changes on unknown
//! hashes revert, and `getCredential` of an unknown hash reverts (which the
//! facade reports as `None`).

use std::collections::HashMap;

use async_trait::async_trait;
use credbridge_core::CredentialHash;
use parking_lot::Mutex;

use super::abi::{encode_hex, keccak256};
use super::{
    abi, Address, CredentialLedger, OnchainCredential, RegistryEvent, StoreCredentialRequest,
    TxReceipt,
};
use crate::error::ClientError;

#[derive(Debug, Default)]
struct Inner {
    credentials: HashMap<CredentialHash, OnchainCredential>,
    by_subject: HashMap<String, Vec<CredentialHash>>,
    block: u64,
    store_calls: usize,
    fail_next_store: Option<String>,
}

/// A registry held in memory.
#[derive(Debug)]
pub struct InMemoryRegistry {
    inner: Mutex<Inner>,
    signer: Address,
    address: Address,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            signer: Address::from_bytes([0x5a; 20]),
            address: Address::from_bytes([0x11; 20]),
        }
    }

    /// Number of `store_credential` calls received, including failed ones.
    pub fn store_calls(&self) -> usize {
        self.inner.lock().store_calls
    }

    /// Number of credentials held.
    pub fn len(&self) -> usize {
        self.inner.lock().credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A stored credential, if any.
    pub fn credential(&self, hash: &CredentialHash) -> Option<OnchainCredential> {
        self.inner.lock().credentials.get(hash).cloned()
    }

    /// Make the next `store_credential` call fail with a revert carrying
    /// `reason`.
    pub fn fail_next_store(&self, reason: impl Into<String>) {
        self.inner.lock().fail_next_store = Some(reason.into());
    }

    fn receipt(inner: &mut Inner, seed: &[u8], events: Vec<RegistryEvent>) -> TxReceipt {
        inner.block += 1;
        let mut material = inner.block.to_be_bytes().to_vec();
        material.extend_from_slice(seed);
        TxReceipt {
            transaction_hash: encode_hex(&keccak256(&material)),
            block_number: Some(inner.block),
            gas_used: Some(21_000),
            events,
        }
    }
}

fn reverted(function: &str, reason: impl Into<String>) -> ClientError {
    ClientError::Reverted {
        function: function.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl CredentialLedger for InMemoryRegistry {
    async fn store_credential(
        &self,
        request: &StoreCredentialRequest,
    ) -> Result<TxReceipt, ClientError> {
        let mut inner = self.inner.lock();
        inner.store_calls += 1;
        if let Some(reason) = inner.fail_next_store.take() {
            return Err(reverted(abi::STORE_CREDENTIAL, reason));
        }
        let hash = request.credential_hash;
        if inner.credentials.contains_key(&hash) {
            return Err(reverted(abi::STORE_CREDENTIAL, "credential already stored"));
        }
        inner.credentials.insert(
            hash,
            OnchainCredential {
                metadata: request.metadata.clone(),
                subject_did: request.subject_did.clone(),
                issuer_name: request.issuer_name.clone(),
                issuer_did: request.issuer_did.clone(),
                active: true,
            },
        );
        inner
            .by_subject
            .entry(request.subject_did.clone())
            .or_default()
            .push(hash);
        Ok(Self::receipt(
            &mut inner,
            hash.as_bytes(),
            vec![RegistryEvent::CredentialStored {
                credential_hash: hash,
            }],
        ))
    }

    async fn set_credential_status(
        &self,
        credential_hash: &CredentialHash,
        active: bool,
    ) -> Result<TxReceipt, ClientError> {
        let mut inner = self.inner.lock();
        let Some(credential) = inner.credentials.get_mut(credential_hash) else {
            return Err(reverted(abi::SET_CREDENTIAL_STATUS, "unknown credential"));
        };
        credential.active = active;
        Ok(Self::receipt(
            &mut inner,
            credential_hash.as_bytes(),
            vec![RegistryEvent::CredentialStatusChanged {
                credential_hash: *credential_hash,
                active,
            }],
        ))
    }

    async fn get_credential(
        &self,
        credential_hash: &CredentialHash,
    ) -> Result<Option<OnchainCredential>, ClientError> {
        Ok(self.credential(credential_hash))
    }

    async fn metadata_of(&self, credential_hash: &CredentialHash) -> Result<String, ClientError> {
        self.credential(credential_hash)
            .map(|c| c.metadata)
            .ok_or_else(|| reverted(abi::METADATA_OF, "unknown credential"))
    }

    async fn exists(&self, credential_hash: &CredentialHash) -> Result<bool, ClientError> {
        Ok(self.inner.lock().credentials.contains_key(credential_hash))
    }

    async fn is_active(&self, credential_hash: &CredentialHash) -> Result<bool, ClientError> {
        Ok(self
            .inner
            .lock()
            .credentials
            .get(credential_hash)
            .is_some_and(|c| c.active))
    }

    async fn credentials_of_subject(
        &self,
        subject_did: &str,
    ) -> Result<Vec<CredentialHash>, ClientError> {
        Ok(self
            .inner
            .lock()
            .by_subject
            .get(subject_did)
            .cloned()
            .unwrap_or_default())
    }

    async fn signer_address(&self) -> Result<Address, ClientError> {
        Ok(self.signer)
    }

    fn registry_address(&self) -> Address {
        self.address
    }

    fn endpoint(&self) -> String {
        "memory".to_string()
    }
}
