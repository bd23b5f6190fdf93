//! Issuance correlation errors.
//!
//! Deferred and skipped events are not errors: they are reported through
//! [`IssueOutcome`](crate::IssueOutcome). Only malformed input and
//! collaborator failure surface here.

use credbridge_client::ClientError;
use credbridge_core::CanonicalizationError;

/// Errors from [`IssuanceCorrelator::handle`](crate::IssuanceCorrelator::handle).
#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    /// The request body is not a JSON object.
    #[error("invalid issuance event: {0}")]
    InvalidEvent(String),

    /// The hash input could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The registry write failed. The pending entry is left in place so a
    /// resubmitted event can resume.
    #[error("registry write failed: {0}")]
    Ledger(#[source] ClientError),
}
