#![deny(missing_docs)]

//! # credbridge-core -- Foundational Types for credbridge
//!
//! This crate defines the types every other crate in the workspace builds on.
//! It has no internal crate dependencies, only `serde`, `serde_json`,
//! `thiserror`, and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **[`CanonicalBytes`] is the sole path to digest computation.** Every
//!    credential hash the bridge writes to the registry flows through
//!    `CanonicalBytes::new()`, which sorts object keys so that the digest is
//!    a function of content only, never of attribute order.
//!
//! 2. **[`CredentialHash`] is the on-chain identifier.** A 32-byte digest
//!    rendered as `0x`-prefixed lowercase hex, parsed strictly at the API
//!    boundary.
//!
//! 3. **DID normalization in one place.** [`normalize_did`] is the only
//!    function that decides what counts as a usable subject or issuer DID.
//!
//! 4. **Narrow errors.** [`CanonicalizationError`] and [`ValidationError`]
//!    are `thiserror` enums that callers fold into their own error types.

pub mod canonical;
pub mod did;
pub mod digest;
pub mod error;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use did::{normalize_did, normalize_did_str};
pub use digest::{sha256_digest, sha256_hex, ContentDigest, CredentialHash};
pub use error::{CanonicalizationError, ValidationError};
