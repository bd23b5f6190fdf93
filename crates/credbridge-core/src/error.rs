//! # Error Hierarchy
//!
//! Structured error types for the foundational layer, built with `thiserror`.
//! Each fallible core operation returns the narrow error it can produce;
//! downstream crates convert them into their own error types.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitives.
///
/// Each error carries the invalid input and the expected format so that
/// operators can diagnose bad requests without guesswork.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Credential hash is not `0x` followed by 64 hex characters.
    #[error("invalid credential hash: \"{0}\" (expected 0x followed by 64 hex characters)")]
    InvalidCredentialHash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_the_input() {
        let err = ValidationError::InvalidCredentialHash("0x12".into());
        let msg = format!("{err}");
        assert!(msg.contains("invalid credential hash"));
        assert!(msg.contains("0x12"));
        assert!(msg.contains("64 hex characters"));
    }

    #[test]
    fn canonicalization_error_wraps_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CanonicalizationError::from(serde_err);
        assert!(format!("{err}").starts_with("serialization failed"));
    }
}
