//! # Check Subcommands
//!
//! Read-only registry lookups. `check` reports everything the registry
//! knows about one credential hash; `subject` lists the hashes stored for
//! a subject DID.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use credbridge_client::{CredentialLedger, OnchainCredential, RegistryConfig, RpcRegistry};
use credbridge_core::{normalize_did_str, CredentialHash};

/// Arguments for `credbridge check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Credential hash (`0x` followed by 64 hex characters).
    #[arg(value_name = "CREDENTIAL_HASH")]
    pub credential_hash: String,
}

/// Arguments for `credbridge subject`.
#[derive(Args, Debug)]
pub struct SubjectArgs {
    /// Subject DID, with or without the `did:` prefix.
    #[arg(value_name = "DID")]
    pub subject_did: String,
}

/// What the registry reports for one credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub credential_hash: CredentialHash,
    pub exists: bool,
    pub is_active: bool,
    /// Absent when the credential does not exist.
    pub record: Option<OnchainCredential>,
    pub metadata: Option<String>,
}

/// Credentials stored for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectReport {
    pub subject_did: String,
    pub credential_hashes: Vec<CredentialHash>,
}

/// Execute `credbridge check`. Exit code 2 when the credential is unknown.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let credential_hash = CredentialHash::parse(&args.credential_hash)?;
    let registry = connect()?;

    let report = crate::block_on(check(&registry, &credential_hash))??;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.exists { 0 } else { 2 })
}

/// Execute `credbridge subject`.
pub fn run_subject(args: &SubjectArgs) -> Result<u8> {
    let registry = connect()?;
    let report = crate::block_on(subject(&registry, &args.subject_did))??;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}

fn connect() -> Result<RpcRegistry> {
    let config =
        RegistryConfig::read_only_from_env().context("registry connection is not configured")?;
    tracing::info!(
        rpc = %config.rpc_url,
        registry = %config.registry_address,
        "querying registry"
    );
    Ok(RpcRegistry::new(config)?)
}

/// Read `exists`, `isActive`, `getCredential` and `metadataOf` for a hash.
///
/// The record and metadata reads are skipped for unknown hashes, which the
/// registry answers with a revert.
pub async fn check(
    ledger: &dyn CredentialLedger,
    credential_hash: &CredentialHash,
) -> Result<CheckReport> {
    let exists = ledger
        .exists(credential_hash)
        .await
        .context("exists() failed")?;
    if !exists {
        return Ok(CheckReport {
            credential_hash: *credential_hash,
            exists,
            is_active: false,
            record: None,
            metadata: None,
        });
    }

    let is_active = ledger
        .is_active(credential_hash)
        .await
        .context("isActive() failed")?;
    let record = ledger
        .get_credential(credential_hash)
        .await
        .context("getCredential() failed")?;
    let metadata = ledger
        .metadata_of(credential_hash)
        .await
        .context("metadataOf() failed")?;

    Ok(CheckReport {
        credential_hash: *credential_hash,
        exists,
        is_active,
        record,
        metadata: Some(metadata),
    })
}

/// Read `credentialsOfSubject`. The DID is stored without its `did:`
/// prefix, so the argument is normalized the same way first.
pub async fn subject(ledger: &dyn CredentialLedger, raw_did: &str) -> Result<SubjectReport> {
    let subject_did = normalize_did_str(raw_did)
        .with_context(|| format!("not a usable subject DID: {raw_did:?}"))?;
    let credential_hashes = ledger
        .credentials_of_subject(&subject_did)
        .await
        .context("credentialsOfSubject() failed")?;
    Ok(SubjectReport {
        subject_did,
        credential_hashes,
    })
}
