//! # Canonical Serialization
//!
//! This module defines [`CanonicalBytes`], the sole construction path for bytes
//! used in credential hash computation.
//!
//! ## Invariant
//!
//! The inner `Vec<u8>` is private. The only way to construct `CanonicalBytes`
//! is through [`CanonicalBytes::new()`], so every digest in the bridge was
//! produced from a key-order-independent encoding.
//!
//! ## Encoding Rules
//!
//! 1. Scalars use their JSON literal encoding.
//! 2. Arrays are encoded element-wise, preserving order.
//! 3. Object keys are sorted lexicographically (byte order of the key text)
//!    before encoding as `{"key":value,...}`.
//! 4. Compact separators, no whitespace.
//!
//! Key sorting is performed explicitly rather than relying on the map type
//! behind `serde_json::Value`, so enabling `preserve_order` anywhere in the
//! dependency graph cannot change a credential hash.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by key-sorted, compact JSON canonicalization.
///
/// The inner `Vec<u8>` is private: downstream code cannot construct
/// `CanonicalBytes` except through [`CanonicalBytes::new()`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(&value)
    }

    /// Construct canonical bytes from an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, CanonicalizationError> {
        let mut out = Vec::with_capacity(128);
        write_canonical(value, &mut out)?;
        Ok(Self(out))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// View the canonical form as text. Canonical JSON is always UTF-8.
    pub fn as_str(&self) -> &str {
        // serde_json only ever emits valid UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively write `value` with sorted object keys and compact separators.
fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalizationError> {
    match value {
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push(b'}');
        }
        // Null, Bool, Number and String use their JSON literal encoding.
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
