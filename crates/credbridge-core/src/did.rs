//! # DID Normalization
//!
//! Wallets and issuers disagree on how they present identifiers: some send
//! `did:example:abc`, some `DID:example:abc`, some pad with whitespace. The
//! registry stores the method-specific part only, so every DID-bearing field
//! the bridge reads goes through [`normalize_did`].

use serde_json::Value;

const DID_PREFIX: &str = "did:";

/// Normalize a candidate DID value.
///
/// Returns `None` for anything that is not a non-blank string. Otherwise the
/// value is trimmed, a leading `did:` prefix is stripped regardless of case,
/// and the remainder is trimmed again. A value that is blank after stripping
/// is treated as absent.
pub fn normalize_did(value: &Value) -> Option<String> {
    value.as_str().and_then(normalize_did_str)
}

/// String form of [`normalize_did`].
pub fn normalize_did_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped = match trimmed.get(..DID_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(DID_PREFIX) => trimmed[DID_PREFIX.len()..].trim(),
        _ => trimmed,
    };
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_lowercase_prefix() {
        assert_eq!(
            normalize_did(&json!("did:example:abc")).as_deref(),
            Some("example:abc")
        );
    }

    #[test]
    fn strips_uppercase_prefix() {
        assert_eq!(
            normalize_did(&json!("DID:example:abc")).as_deref(),
            Some("example:abc")
        );
    }

    #[test]
    fn strips_mixed_case_prefix_and_whitespace() {
        assert_eq!(
            normalize_did(&json!("  Did: example:abc ")).as_deref(),
            Some("example:abc")
        );
    }

    #[test]
    fn leaves_bare_identifiers_alone() {
        assert_eq!(
            normalize_did(&json!("example:abc")).as_deref(),
            Some("example:abc")
        );
    }

    #[test]
    fn blank_and_non_string_values_are_absent() {
        assert_eq!(normalize_did(&json!("")), None);
        assert_eq!(normalize_did(&json!("   ")), None);
        assert_eq!(normalize_did(&json!("did:")), None);
        assert_eq!(normalize_did(&json!(null)), None);
        assert_eq!(normalize_did(&json!(17)), None);
        assert_eq!(normalize_did(&json!({"id": "did:x:y"})), None);
    }

    #[test]
    fn short_strings_do_not_panic() {
        assert_eq!(normalize_did_str("di").as_deref(), Some("di"));
        assert_eq!(normalize_did_str("é").as_deref(), Some("é"));
    }
}
