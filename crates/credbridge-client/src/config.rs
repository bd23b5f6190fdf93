//! Collaborator client configuration.
//!
//! Every value is sourced from the environment and validated once at
//! startup; a missing required value is a fatal error. The lookups go
//! through a caller-supplied function so tests never mutate the process
//! environment.

use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::registry::Address;

/// Default outbound request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default interval between `eth_getTransactionReceipt` polls.
const DEFAULT_RECEIPT_POLL_MS: u64 = 500;
/// Default upper bound on waiting for a transaction to be mined.
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

/// Hex-encoded secp256k1 private key used to sign registry transactions.
///
/// Zeroized on drop; `Debug` never prints the key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// Wrap a hex-encoded private key (with or without `0x`).
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The raw hex text. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret([REDACTED])")
    }
}

/// Configuration for the on-chain credential registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Ethereum JSON-RPC endpoint (`RPC_URL`).
    pub rpc_url: Url,
    /// EIP-155 chain identifier (`CHAIN_ID`).
    pub chain_id: u64,
    /// Deployed registry contract (`REGISTRY_ADDRESS`).
    pub registry_address: Address,
    /// Signing key (`PRIVATE_KEY`). Absent for read-only use such as the
    /// `check` CLI; write operations then fail with `MissingSigner`.
    pub private_key: Option<SigningSecret>,
    /// Request timeout in seconds (`HTTP_TIMEOUT_SECS`, default 30).
    pub timeout_secs: u64,
    /// Receipt polling interval (`RECEIPT_POLL_MS`, default 500).
    pub receipt_poll_ms: u64,
    /// Receipt wait bound (`RECEIPT_TIMEOUT_SECS`, default 120).
    pub receipt_timeout_secs: u64,
}

impl RegistryConfig {
    /// Load a write-capable configuration from the environment.
    ///
    /// Variables:
    /// - `RPC_URL` (required)
    /// - `CHAIN_ID` (required)
    /// - `REGISTRY_ADDRESS` (required)
    /// - `PRIVATE_KEY` (required)
    /// - `HTTP_TIMEOUT_SECS`, `RECEIPT_POLL_MS`, `RECEIPT_TIMEOUT_SECS` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a read-only configuration: `PRIVATE_KEY` becomes optional.
    pub fn read_only_from_env() -> Result<Self, ConfigError> {
        Self::read_only_from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RegistryConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::read_only_from_lookup(&lookup)?;
        let key = required(&lookup, "PRIVATE_KEY")?;
        config.private_key = Some(SigningSecret::new(key));
        Ok(config)
    }

    /// Like [`RegistryConfig::read_only_from_env`], reading values through `lookup`.
    pub fn read_only_from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let rpc_url = parse_url("RPC_URL", &required(&lookup, "RPC_URL")?)?;
        let chain_id_raw = required(&lookup, "CHAIN_ID")?;
        let chain_id = chain_id_raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid("CHAIN_ID".into(), chain_id_raw.clone()))?;
        let address_raw = required(&lookup, "REGISTRY_ADDRESS")?;
        let registry_address = Address::parse(&address_raw)
            .map_err(|_| ConfigError::Invalid("REGISTRY_ADDRESS".into(), address_raw.clone()))?;

        Ok(Self {
            rpc_url,
            chain_id,
            registry_address,
            private_key: optional(&lookup, "PRIVATE_KEY").map(SigningSecret::new),
            timeout_secs: parse_or(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            receipt_poll_ms: parse_or(&lookup, "RECEIPT_POLL_MS", DEFAULT_RECEIPT_POLL_MS)?,
            receipt_timeout_secs: parse_or(
                &lookup,
                "RECEIPT_TIMEOUT_SECS",
                DEFAULT_RECEIPT_TIMEOUT_SECS,
            )?,
        })
    }

    /// Create a configuration pointing at a local mock RPC server (for testing).
    pub fn local_mock(rpc_url: &str, private_key: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            rpc_url: parse_url("RPC_URL", rpc_url)?,
            chain_id: 31337,
            registry_address: Address::from_bytes([0x11; 20]),
            private_key: private_key.map(SigningSecret::new),
            timeout_secs: 5,
            receipt_poll_ms: 10,
            receipt_timeout_secs: 2,
        })
    }
}

/// Configuration for the door-action endpoint.
#[derive(Debug, Clone)]
pub struct DoorConfig {
    /// URL to GET when a verification succeeds (`DOOR0_URL`, required).
    pub url: Url,
    /// Request timeout in seconds (`HTTP_TIMEOUT_SECS`, default 30).
    pub timeout_secs: u64,
}

impl DoorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`DoorConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: parse_url("DOOR0_URL", &required(&lookup, "DOOR0_URL")?)?,
            timeout_secs: parse_or(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var).filter(|v| !v.trim().is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<String, ConfigError> {
    optional(lookup, var).ok_or_else(|| ConfigError::Missing(var.to_string()))
}

fn parse_or(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match optional(lookup, var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(var.to_string(), raw)),
        None => Ok(default),
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
