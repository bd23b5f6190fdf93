//! # Issuance Correlator
//!
//! Reconciles the issuer's multi-step handshake into one registry write.
//!
//! ## Transitions
//!
//! ```text
//!            succeeded(T)             did(T?)              ack(T)
//! (unseen) ───────────────▶ pending ─────────▶ pending ──────────▶ finalize
//!     │     store payload     │      store subject       set ack      │
//!     │     defer: awaiting-  │      (either order)                   ▼
//!     │     wallet-save       └──────────────── ack(T) ───────▶ missing-subject-did
//!     │                                                          (entry kept)
//!     └── other events ──▶ skipped (no mutation)
//! ```
//!
//! A finalized record is produced only when a subject DID is known and a
//! wallet acknowledgement has been seen. Anything short of that is a
//! deferral, never an error.
//!
//! ## Ordering
//!
//! All transitions for one token run under that token's lock, including the
//! registry write. Token-less events are attributed to the most recent
//! token in the [`CorrelationContext`] and lock that token.

use std::sync::Arc;
use std::time::Duration;

use credbridge_client::{
    ClientError, CredentialLedger, OnchainCredential, StoreCredentialRequest, TxReceipt,
};
use credbridge_core::{CanonicalBytes, CredentialHash};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::context::{CorrelationContext, DEFAULT_WINDOW};
use crate::error::CorrelationError;
use crate::event::{EventKind, IssuanceEvent, WALLET_SUBJECT_DID};
use crate::extract::{
    extract_credential_id, extract_issuer_did, extract_issuer_name, extract_subject_did,
    first_truthy, resolve_credential,
};
use crate::locks::{TokenGuard, TokenLocks};
use crate::metadata::MetadataBuilder;
use crate::pending::{PendingEntry, PendingStore};

/// Default idle lifetime of a pending entry.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Correlator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatorConfig {
    /// Idle lifetime of pending entries. `None` keeps them for the life of
    /// the process.
    pub pending_ttl: Option<Duration>,
    /// Number of recent tokens and subject hints kept for token-less events.
    pub correlation_window: usize,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            pending_ttl: Some(DEFAULT_PENDING_TTL),
            correlation_window: DEFAULT_WINDOW,
        }
    }
}

/// Why an event did not (yet) produce a registry write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferReason {
    /// Issuance succeeded; waiting for the wallet to save the credential.
    AwaitingWalletSave,
    /// No subject DID is known for the flow yet.
    MissingSubjectDid,
    /// The subject is known but the wallet has not acknowledged.
    AwaitingWalletAck,
}

impl DeferReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingWalletSave => "awaiting-wallet-save",
            Self::MissingSubjectDid => "missing-subject-did",
            Self::AwaitingWalletAck => "awaiting-wallet-ack",
        }
    }
}

impl std::fmt::Display for DeferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential ready to be written to the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedCredential {
    pub credential_hash: CredentialHash,
    /// Canonical JSON of the payload the hash was computed over.
    pub hash_input: String,
    pub metadata: Value,
    /// Canonical JSON of `metadata`, as stored on-chain.
    pub metadata_string: String,
    pub subject_did: String,
    pub issuer_name: Option<String>,
    pub issuer_did: Option<String>,
    pub txnid: Option<String>,
}

/// A finalized credential together with what the registry reported.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCredential {
    pub record: FinalizedCredential,
    pub receipt: TxReceipt,
    /// Read-back of the stored credential; `None` if the read failed.
    pub onchain_record: Option<OnchainCredential>,
    pub contract_exists: bool,
    pub is_active: bool,
}

/// Result of handling one issuance event.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    /// The flow is incomplete; state was recorded.
    Deferred(DeferReason),
    /// The event is irrelevant to issuance; no state was touched.
    Skipped { reason: String },
    /// The credential was written to the registry.
    Stored(Box<StoredCredential>),
}

impl IssueOutcome {
    /// The `reason` reported for deferred and skipped outcomes.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Deferred(reason) => Some(reason.as_str()),
            Self::Skipped { reason } => Some(reason),
            Self::Stored(_) => None,
        }
    }
}

/// The pending-issuance correlator.
#[derive(Debug)]
pub struct IssuanceCorrelator {
    ledger: Arc<dyn CredentialLedger>,
    pending: PendingStore,
    context: Mutex<CorrelationContext>,
    locks: TokenLocks,
    config: CorrelatorConfig,
}

impl IssuanceCorrelator {
    pub fn new(ledger: Arc<dyn CredentialLedger>, config: CorrelatorConfig) -> Self {
        Self {
            ledger,
            pending: PendingStore::new(),
            context: Mutex::new(CorrelationContext::new(config.correlation_window)),
            locks: TokenLocks::default(),
            config,
        }
    }

    /// The registry this correlator writes to.
    pub fn ledger(&self) -> &Arc<dyn CredentialLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// A snapshot of the pending entry for `token`.
    pub fn pending_entry(&self, token: &str) -> Option<PendingEntry> {
        self.pending.get(token)
    }

    /// Number of in-flight issuances.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The token a token-less event would currently be attributed to.
    pub fn last_known_token(&self) -> Option<String> {
        self.context.lock().last_token().map(str::to_string)
    }

    /// Evict pending entries idle longer than the configured TTL. Returns
    /// the number evicted; always zero when no TTL is configured.
    pub fn sweep_expired(&self) -> usize {
        let Some(ttl) = self.config.pending_ttl else {
            return 0;
        };
        let evicted = self.pending.sweep_expired(ttl);
        if !evicted.is_empty() {
            let mut context = self.context.lock();
            for token in &evicted {
                context.forget(Some(token));
            }
            tracing::info!(
                evicted = evicted.len(),
                ttl_secs = ttl.as_secs(),
                "evicted idle pending issuances"
            );
        }
        evicted.len()
    }

    /// Handle one issuance event.
    pub async fn handle(&self, event: IssuanceEvent) -> Result<IssueOutcome, CorrelationError> {
        tracing::debug!(payload = %event.body(), "raw issuance payload");
        if event.is_cloud_event() {
            tracing::info!(
                event_type = event.event_type(),
                txnid = event.txnid(),
                source = event.source(),
                time = event.time(),
                "cloud event received: {}",
                event.kind()
            );
        }

        if let Some(token) = event.txnid() {
            self.context.lock().observe_token(token);
        }

        if event.kind() == EventKind::Succeeded {
            if let Some(token) = event.txnid() {
                let _guard = self.locks.acquire(token).await;
                self.pending.upsert(token, |entry| {
                    entry.succeeded_payload = Some(event.body().clone());
                });
            }
            tracing::info!(
                txnid = event.txnid(),
                reason = DeferReason::AwaitingWalletSave.as_str(),
                "issuance succeeded; deferring registry write until the wallet confirms"
            );
            return Ok(IssueOutcome::Deferred(DeferReason::AwaitingWalletSave));
        }

        let is_ack = event.kind() == EventKind::Ack;
        if !is_ack && event.wallet_did().is_none() {
            let reason = event.event_type().unwrap_or("unknown-event").to_string();
            tracing::info!(reason = %reason, "skipping registry write for event");
            return Ok(IssueOutcome::Skipped { reason });
        }

        let (token, guard) = self.lock_effective_token(&event).await;
        let outcome = self.advance(&event, token.as_deref()).await;
        drop(guard);
        outcome
    }

    /// Resolve the token an event belongs to and take its lock. A token-less
    /// event borrows the most recent token; if that token is finalized
    /// while waiting for the lock, resolution starts over.
    async fn lock_effective_token(
        &self,
        event: &IssuanceEvent,
    ) -> (Option<String>, TokenGuard<'_>) {
        loop {
            let token = self.effective_token(event);
            let guard = self.locks.acquire(token.as_deref().unwrap_or("")).await;
            if self.effective_token(event) == token {
                tracing::trace!(lock = guard.key(), "token lock acquired");
                return (token, guard);
            }
        }
    }

    fn effective_token(&self, event: &IssuanceEvent) -> Option<String> {
        event
            .txnid()
            .map(str::to_string)
            .or_else(|| self.last_known_token())
    }

    /// Apply ack / subject transitions and finalize if ready. Runs under
    /// the token lock.
    async fn advance(
        &self,
        event: &IssuanceEvent,
        token: Option<&str>,
    ) -> Result<IssueOutcome, CorrelationError> {
        let is_ack = event.kind() == EventKind::Ack;
        let wallet_did = event.wallet_did();
        let mut entry = token.and_then(|t| self.pending.get(t));

        if let Some(token) = token.filter(|_| is_ack) {
            entry = Some(self.pending.upsert(token, |entry| {
                entry.ack_payload = Some(event.body().clone());
                entry.ack_received = true;
            }));
        }

        if let Some(did) = wallet_did {
            if let Some(token) = token {
                entry = Some(self.pending.upsert(token, |entry| {
                    entry.subject_did = Some(did.to_string());
                }));
            }
            self.context.lock().record_subject(token, did);
            tracing::info!(
                event_type = event.event_type().unwrap_or(WALLET_SUBJECT_DID),
                txnid = token,
                subject_did = did,
                "subject DID detected for credential flow"
            );
        }

        let body = event.body();
        let effective_payload = entry
            .as_ref()
            .and_then(|e| e.succeeded_payload.as_ref())
            .unwrap_or(body);
        let credential = resolve_credential(effective_payload)
            .or_else(|| resolve_credential(body))
            .unwrap_or(effective_payload);

        let hint = self
            .context
            .lock()
            .subject_hint(token)
            .map(str::to_string);
        let subject_did = wallet_did
            .map(str::to_string)
            .or_else(|| entry.as_ref().and_then(|e| e.subject_did.clone()))
            .or(hint)
            .or_else(|| extract_subject_did(effective_payload, Some(credential)))
            .or_else(|| extract_subject_did(body, Some(credential)));

        let ack_received = is_ack || entry.as_ref().is_some_and(|e| e.ack_received);
        let ack_payload = if is_ack {
            Some(body)
        } else {
            entry.as_ref().and_then(|e| e.ack_payload.as_ref())
        };

        let Some(subject_did) = subject_did else {
            tracing::info!(
                txnid = token,
                event_type = event.event_type().unwrap_or(WALLET_SUBJECT_DID),
                reason = DeferReason::MissingSubjectDid.as_str(),
                "subject DID not yet available; deferring registry write"
            );
            return Ok(IssueOutcome::Deferred(DeferReason::MissingSubjectDid));
        };
        if !ack_received {
            tracing::info!(
                txnid = token,
                reason = DeferReason::AwaitingWalletAck.as_str(),
                "subject DID captured; waiting for wallet acknowledgement"
            );
            return Ok(IssueOutcome::Deferred(DeferReason::AwaitingWalletAck));
        }

        let record = finalize(Finalization {
            event,
            token,
            effective_payload,
            credential,
            subject_did,
            ack_payload,
        })?;
        self.commit(record, token).await
    }

    /// Write `record` to the registry, clear local state, and read it back.
    async fn commit(
        &self,
        record: FinalizedCredential,
        token: Option<&str>,
    ) -> Result<IssueOutcome, CorrelationError> {
        let request = StoreCredentialRequest {
            credential_hash: record.credential_hash,
            metadata: record.metadata_string.clone(),
            subject_did: record.subject_did.clone(),
            issuer_name: record.issuer_name.clone().unwrap_or_default(),
            issuer_did: record.issuer_did.clone().unwrap_or_default(),
        };

        let receipt = match self.ledger.store_credential(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!(
                    txnid = token,
                    credential_hash = %record.credential_hash,
                    error = %e,
                    "registry write failed; pending issuance kept for resubmission"
                );
                return Err(CorrelationError::Ledger(e));
            }
        };

        if let Some(token) = token {
            self.pending.remove(token);
        }
        self.context.lock().forget(token);

        let hash = &record.credential_hash;
        let onchain_record = self
            .ledger
            .get_credential(hash)
            .await
            .unwrap_or_else(|e| {
                read_back_failed("getCredential", hash, &e);
                None
            });
        let contract_exists = match self.ledger.exists(hash).await {
            Ok(exists) => exists,
            Err(e) => {
                read_back_failed("exists", hash, &e);
                onchain_record.is_some()
            }
        };
        let is_active = match self.ledger.is_active(hash).await {
            Ok(active) => active,
            Err(e) => {
                read_back_failed("isActive", hash, &e);
                onchain_record.as_ref().is_some_and(|r| r.active)
            }
        };

        tracing::info!(
            txnid = token,
            credential_hash = %record.credential_hash,
            tx_hash = %receipt.transaction_hash,
            subject_did = %record.subject_did,
            contract_exists,
            is_active,
            "credential stored"
        );

        Ok(IssueOutcome::Stored(Box::new(StoredCredential {
            record,
            receipt,
            onchain_record,
            contract_exists,
            is_active,
        })))
    }
}

fn read_back_failed(function: &str, hash: &CredentialHash, error: &ClientError) {
    tracing::warn!(
        function,
        credential_hash = %hash,
        error = %error,
        "unable to read credential back from registry after storing"
    );
}

struct Finalization<'a> {
    event: &'a IssuanceEvent,
    token: Option<&'a str>,
    effective_payload: &'a Value,
    credential: &'a Value,
    subject_did: String,
    ack_payload: Option<&'a Value>,
}

/// Build the finalized record: hash the effective payload and assemble
/// metadata.
fn finalize(f: Finalization<'_>) -> Result<FinalizedCredential, CorrelationError> {
    let body = f.event.body();
    let effective = f.effective_payload;
    let credential = Some(f.credential);
    let did_event = f.event.wallet_did().is_some();

    let issuer_name = extract_issuer_name(effective, credential);
    let issuer_did = extract_issuer_did(effective, credential)
        .or_else(|| extract_issuer_did(body, credential));
    let credential_id = extract_credential_id(credential, &[effective, body]);

    let raw_metadata = [effective.get("metadata"), body.get("metadata")]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null());
    let mut metadata = MetadataBuilder::from_raw(raw_metadata);

    let txnid = f
        .token
        .map(|t| Value::String(t.to_string()))
        .or_else(|| {
            [effective.get("txnid"), body.get("txnid")]
                .into_iter()
                .flatten()
                .find(|v| !v.is_null())
                .cloned()
        });
    metadata.ensure("txnid", txnid.as_ref());

    let fallback_type = did_event.then(|| Value::String(WALLET_SUBJECT_DID.into()));
    metadata.ensure(
        "type",
        first_truthy([effective.get("type"), body.get("type"), fallback_type.as_ref()]),
    );
    metadata.ensure(
        "time",
        first_truthy([effective.get("time"), body.get("time"), body.get("timestamp")]),
    );
    metadata
        .ensure_str("issuer", issuer_name.as_deref())
        .ensure_str("issuerDid", issuer_did.as_deref())
        .ensure_str("subjectDid", Some(&f.subject_did));
    if did_event {
        metadata.ensure("walletTimestamp", first_truthy([body.get("timestamp")]));
    }
    if let Some(ack) = f.ack_payload {
        metadata
            .ensure("walletAckTime", first_truthy([ack.get("time")]))
            .ensure("walletAckType", first_truthy([ack.get("type")]));
    }
    let wallet_event_type = f
        .event
        .event_type()
        .or_else(|| did_event.then_some(WALLET_SUBJECT_DID));
    metadata
        .ensure_str("walletEventType", wallet_event_type)
        .ensure_str("credentialId", credential_id.as_deref());

    let hash_input = CanonicalBytes::from_value(effective)?;
    let credential_hash = CredentialHash::of(&hash_input);
    let metadata = metadata.build();
    let metadata_string = CanonicalBytes::from_value(&metadata)?.as_str().to_string();

    Ok(FinalizedCredential {
        credential_hash,
        hash_input: hash_input.as_str().to_string(),
        metadata,
        metadata_string,
        subject_did: f.subject_did,
        issuer_name,
        issuer_did,
        txnid: f.token.map(str::to_string),
    })
}
