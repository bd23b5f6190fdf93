//! # credbridge-issuance -- Issuance Reconciliation
//!
//! An issuance arrives as several independent webhook calls: the issuer
//! reports success, the wallet posts its DID, the wallet acknowledges
//! saving the credential. None of them alone carries everything the
//! registry needs, and they arrive in no guaranteed order. This crate
//! correlates them by `txnid` and performs exactly one registry write per
//! completed flow.
//!
//! ## Modules
//!
//! - [`event`]: envelope parsing and event classification.
//! - [`extract`]: ordered field-extraction rules over arbitrary payloads.
//! - [`metadata`]: first-writer-wins metadata assembly.
//! - [`pending`]: the token-keyed store of partial observations.
//! - [`context`]: fallback attribution for token-less events.
//! - [`correlator`]: the state machine tying them together.
//!
//! ## Crate Policy
//!
//! - No process-global state. Everything lives in an [`IssuanceCorrelator`]
//!   the caller owns and injects.
//! - Deferral is an outcome, not an error.

pub mod context;
pub mod correlator;
pub mod error;
pub mod event;
pub mod extract;
mod locks;
pub mod metadata;
pub mod pending;

pub use context::CorrelationContext;
pub use correlator::{
    CorrelatorConfig, DeferReason, FinalizedCredential, IssuanceCorrelator, IssueOutcome,
    StoredCredential,
};
pub use error::CorrelationError;
pub use event::{EventKind, IssuanceEvent};
pub use pending::{PendingEntry, PendingStore};
