//! # Registry ABI Encoding
//!
//! Solidity ABI encoding for the handful of types the registry surface uses:
//! `bytes32`, `bool`, `string`, and `bytes32[]`. Every value occupies one or
//! more 32-byte words; dynamic values (`string`, arrays) are referenced from
//! the head by a byte offset into the argument block.

use sha3::{Digest, Keccak256};

/// `storeCredential(bytes32,string,string,string,string)`
pub const STORE_CREDENTIAL: &str = "storeCredential(bytes32,string,string,string,string)";
/// `setCredentialStatus(bytes32,bool)`
pub const SET_CREDENTIAL_STATUS: &str = "setCredentialStatus(bytes32,bool)";
/// `getCredential(bytes32)`
pub const GET_CREDENTIAL: &str = "getCredential(bytes32)";
/// `metadataOf(bytes32)`
pub const METADATA_OF: &str = "metadataOf(bytes32)";
/// `exists(bytes32)`
pub const EXISTS: &str = "exists(bytes32)";
/// `isActive(bytes32)`
pub const IS_ACTIVE: &str = "isActive(bytes32)";
/// `credentialsOfSubject(string)`
pub const CREDENTIALS_OF_SUBJECT: &str = "credentialsOfSubject(string)";

/// `CredentialStored(bytes32,string)` event signature.
pub const CREDENTIAL_STORED_EVENT: &str = "CredentialStored(bytes32,string)";
/// `CredentialStatusChanged(bytes32,bool)` event signature.
pub const CREDENTIAL_STATUS_CHANGED_EVENT: &str = "CredentialStatusChanged(bytes32,bool)";

const WORD: usize = 32;

/// ABI encoding/decoding failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("return data too short: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("offset or length does not fit in memory: {0}")]
    Overflow(String),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid bool word")]
    InvalidBool,
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// A single ABI argument.
#[derive(Debug, Clone, Copy)]
pub enum Token<'a> {
    FixedBytes32(&'a [u8; 32]),
    Bool(bool),
    Str(&'a str),
}

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// First four bytes of the Keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic 0 of an event: the full Keccak-256 of its signature.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

/// Encode a call: selector followed by the encoded argument block.
pub fn encode_call(signature: &str, args: &[Token<'_>]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_args(args));
    out
}

/// Encode an argument tuple (head words, then tails of dynamic values).
pub fn encode_args(args: &[Token<'_>]) -> Vec<u8> {
    let mut head = Vec::with_capacity(args.len() * WORD);
    let mut tail = Vec::new();
    let head_len = args.len() * WORD;

    for arg in args {
        match arg {
            Token::FixedBytes32(bytes) => head.extend_from_slice(&bytes[..]),
            Token::Bool(value) => head.extend_from_slice(&uint_word(u64::from(*value))),
            Token::Str(text) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(text.len() as u64));
                tail.extend_from_slice(text.as_bytes());
                pad_to_word(&mut tail);
            }
        }
    }

    head.extend(tail);
    head
}

/// Decode a single `bool` return value.
pub fn decode_bool(data: &[u8]) -> Result<bool, AbiError> {
    bool_at(data, 0)
}

/// Decode a single `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, AbiError> {
    string_at(data, 0)
}

/// Decode a `(string,string,string,string,bool)` return tuple.
pub fn decode_credential_tuple(
    data: &[u8],
) -> Result<(String, String, String, String, bool), AbiError> {
    Ok((
        string_at(data, 0)?,
        string_at(data, 1)?,
        string_at(data, 2)?,
        string_at(data, 3)?,
        bool_at(data, 4)?,
    ))
}

/// Decode a single `bytes32[]` return value.
pub fn decode_bytes32_array(data: &[u8]) -> Result<Vec<[u8; 32]>, AbiError> {
    let offset = usize_word(word(data, 0)?)?;
    let len = usize_word(slice(data, offset, WORD)?)?;
    let start = offset
        .checked_add(WORD)
        .ok_or_else(|| AbiError::Overflow("array start".into()))?;
    (0..len)
        .map(|i| {
            let at = start
                .checked_add(i * WORD)
                .ok_or_else(|| AbiError::Overflow("array element".into()))?;
            let mut item = [0u8; 32];
            item.copy_from_slice(slice(data, at, WORD)?);
            Ok(item)
        })
        .collect()
}

/// Lowercase `0x`-prefixed hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Decode hex with an optional `0x` prefix.
pub fn decode_hex(raw: &str) -> Result<Vec<u8>, AbiError> {
    let s = raw.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(AbiError::InvalidHex(raw.to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| AbiError::InvalidHex(raw.to_string()))
        })
        .collect()
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

fn pad_to_word(buf: &mut Vec<u8>) {
    let rem = buf.len() % WORD;
    if rem != 0 {
        buf.resize(buf.len() + WORD - rem, 0);
    }
}

fn slice(data: &[u8], at: usize, len: usize) -> Result<&[u8], AbiError> {
    let end = at
        .checked_add(len)
        .ok_or_else(|| AbiError::Overflow(format!("{at}+{len}")))?;
    data.get(at..end).ok_or(AbiError::Truncated {
        needed: end,
        actual: data.len(),
    })
}

fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    slice(data, index * WORD, WORD)
}

fn usize_word(word: &[u8]) -> Result<usize, AbiError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(encode_hex(word)));
    }
    let mut be = [0u8; 8];
    be.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(be)).map_err(|e| AbiError::Overflow(e.to_string()))
}

fn bool_at(data: &[u8], index: usize) -> Result<bool, AbiError> {
    let w = word(data, index)?;
    if w[..31].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidBool);
    }
    match w[31] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(AbiError::InvalidBool),
    }
}

fn string_at(data: &[u8], index: usize) -> Result<String, AbiError> {
    let offset = usize_word(word(data, index)?)?;
    let len = usize_word(slice(data, offset, WORD)?)?;
    let bytes = slice(data, offset + WORD, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}
