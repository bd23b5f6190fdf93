//! Collaborator client error types.

use crate::registry::abi::AbiError;

/// Errors from registry and door calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The collaborator returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The JSON-RPC node answered with an error object.
    #[error("JSON-RPC {method} failed ({code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    /// A contract call or transaction reverted.
    #[error("registry call {function} reverted: {reason}")]
    Reverted { function: String, reason: String },
    /// The JSON-RPC result did not have the expected shape.
    #[error("unexpected JSON-RPC result for {method}: {detail}")]
    UnexpectedResult { method: String, detail: String },
    /// ABI encoding or decoding failed.
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),
    /// A write was requested but no signing key is configured.
    #[error("no signing key configured; PRIVATE_KEY is required for registry writes")]
    MissingSigner,
    /// The signing key could not be loaded or used.
    #[error("signing error: {0}")]
    Signing(String),
    /// The transaction was not mined within the configured bound.
    #[error("transaction {tx_hash} was not mined within {waited_secs}s")]
    ReceiptTimeout { tx_hash: String, waited_secs: u64 },
    /// The transaction was mined with a failure status.
    #[error("transaction {tx_hash} failed on-chain")]
    TransactionFailed { tx_hash: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl ClientError {
    /// Whether this error is a contract revert (as opposed to a transport or
    /// node failure).
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }
}
