//! # Content Digests and Credential Hashes
//!
//! Defines [`ContentDigest`], the SHA-256 digest of [`CanonicalBytes`], and
//! [`CredentialHash`], its `0x`-prefixed on-chain rendering used as the
//! registry key (`bytes32 credentialHash`).
//!
//! ## Invariant
//!
//! `ContentDigest` can only be computed from [`CanonicalBytes`]. This ensures
//! every credential hash in the bridge was produced from canonicalized data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::ValidationError;

/// A 32-byte SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    bytes: [u8; 32],
}

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// The raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Return the digest as a lowercase hex string (64 characters, no prefix).
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute the SHA-256 digest of canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::from_bytes(bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
///
/// Convenience wrapper around [`sha256_digest()`] for contexts that need
/// the digest as a bare hex string.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// The registry key of a stored credential: a 32-byte digest rendered as
/// `0x` followed by 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialHash([u8; 32]);

impl CredentialHash {
    /// Derive the credential hash of a canonicalized payload.
    pub fn of(data: &CanonicalBytes) -> Self {
        Self(*sha256_digest(data).as_bytes())
    }

    /// Wrap raw bytes (e.g. a `bytes32` decoded from the registry).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 bytes, as passed to the contract's `bytes32` parameter.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a `0x`-prefixed 64-hex-character string. Surrounding whitespace
    /// is ignored and hex digits are accepted in either case.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidCredentialHash(raw.to_string()))?;
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidCredentialHash(raw.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| ValidationError::InvalidCredentialHash(raw.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for CredentialHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CredentialHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CredentialHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_of_empty_object_is_stable() {
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        // sha256("{}")
        assert_eq!(
            sha256_hex(&cb),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        let cb = CanonicalBytes::new(&json!({"txnid": "t-1", "type": "x"})).unwrap();
        assert_eq!(sha256_digest(&cb), sha256_digest(&cb));
        assert_eq!(sha256_hex(&cb).len(), 64);
    }

    #[test]
    fn credential_hash_renders_with_prefix() {
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        let hash = CredentialHash::of(&cb);
        assert_eq!(hash.to_string(), format!("0x{}", sha256_hex(&cb)));
    }

    #[test]
    fn credential_hash_parse_roundtrips_display() {
        let text = format!("0x{}", "ab".repeat(32));
        let hash = CredentialHash::parse(&text).unwrap();
        assert_eq!(hash.to_string(), text);
        assert_eq!(hash.as_bytes()[0], 0xab);
    }

    #[test]
    fn credential_hash_accepts_whitespace_and_uppercase() {
        let text = format!("  0x{}  ", "AB".repeat(32));
        let hash = CredentialHash::parse(&text).unwrap();
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(32)));
    }

    #[test]
    fn credential_hash_rejects_missing_prefix() {
        assert!(CredentialHash::parse(&"ab".repeat(32)).is_err());
    }

    #[test]
    fn credential_hash_rejects_wrong_length() {
        assert!(CredentialHash::parse("0xabcd").is_err());
        assert!(CredentialHash::parse(&format!("0x{}", "a".repeat(65))).is_err());
    }

    #[test]
    fn credential_hash_rejects_non_hex() {
        assert!(CredentialHash::parse(&format!("0x{}", "zz".repeat(32))).is_err());
    }

    #[test]
    fn credential_hash_serde_uses_string_form() {
        let hash = CredentialHash::from_bytes([1u8; 32]);
        let json = serde_json::to_value(hash).unwrap();
        assert_eq!(json, json!(format!("0x{}", "01".repeat(32))));
        let back: CredentialHash = serde_json::from_value(json).unwrap();
        assert_eq!(back, hash);
    }
}
