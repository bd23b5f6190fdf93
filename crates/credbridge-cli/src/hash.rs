//! # Hash Subcommand
//!
//! Reproduces the credential hash offline. The bridge hashes the canonical
//! JSON (sorted keys, no whitespace) of the issuance-succeeded payload, so
//! pointing this at a captured webhook body yields the hash that was, or
//! will be, written to the registry.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use credbridge_core::{CanonicalBytes, CredentialHash};

/// Arguments for `credbridge hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Path to a JSON payload file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Also print the canonical JSON the hash is computed over.
    #[arg(long)]
    pub show_input: bool,
}

/// Result of hashing one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashReport {
    pub credential_hash: CredentialHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_input: Option<String>,
}

/// Execute `credbridge hash`.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let mut report = hash_file(&args.file)?;
    if !args.show_input {
        report.hash_input = None;
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}

/// Read, parse and hash a JSON payload file.
pub fn hash_file(path: &Path) -> Result<HashReport> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse JSON: {}", path.display()))?;

    let canonical = CanonicalBytes::from_value(&value)?;
    tracing::debug!(bytes = canonical.as_bytes().len(), "canonicalized payload");

    Ok(HashReport {
        credential_hash: CredentialHash::of(&canonical),
        hash_input: Some(canonical.as_str().to_string()),
    })
}
