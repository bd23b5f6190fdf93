//! # Issuance Events
//!
//! The issuer emits CloudEvents-shaped notifications as an issuance moves
//! through its handshake:
//!
//! | `type` | Meaning |
//! |--------|---------|
//! | `issuer.oidc-interaction-initiated.v1` | offer created |
//! | `issuer.oidc-interaction-qr-scanned.v1` | wallet opened the offer |
//! | `issuer.oidc-interaction-succeeded.v1` | credential issued to the wallet |
//! | `issuer.oidc-interaction-ack-succeeded.v1` | wallet saved the credential |
//!
//! Wallets additionally post their subject DID as a bare `{ "did": ... }`
//! object, usually without a `type` and often without a `txnid`. Such an
//! observation is recognized by the `did` field alone.

use std::fmt;

use credbridge_core::normalize_did;
use serde_json::Value;

use crate::error::CorrelationError;

/// Issuer created the credential offer.
pub const INITIATED: &str = "issuer.oidc-interaction-initiated.v1";
/// Wallet scanned the offer QR code.
pub const QR_SCANNED: &str = "issuer.oidc-interaction-qr-scanned.v1";
/// Credential issued; the wallet has not confirmed saving it yet.
pub const SUCCEEDED: &str = "issuer.oidc-interaction-succeeded.v1";
/// Wallet acknowledged (saved) the credential.
pub const ACK_SUCCEEDED: &str = "issuer.oidc-interaction-ack-succeeded.v1";

/// `type` recorded in metadata for a wallet DID observation without one.
pub const WALLET_SUBJECT_DID: &str = "wallet.subject-did";

/// Classification of an issuance event by its `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Initiated,
    QrScanned,
    Succeeded,
    Ack,
    Other,
}

impl EventKind {
    /// Classify an event type. Matching is exact.
    pub fn from_type(event_type: Option<&str>) -> Self {
        match event_type {
            Some(INITIATED) => Self::Initiated,
            Some(QR_SCANNED) => Self::QrScanned,
            Some(SUCCEEDED) => Self::Succeeded,
            Some(ACK_SUCCEEDED) => Self::Ack,
            _ => Self::Other,
        }
    }

    /// Human-readable description for logs.
    pub fn description(self) -> &'static str {
        match self {
            Self::Initiated => "issuer initiated issuance (offer created)",
            Self::QrScanned => "wallet scanned QR / offer opened",
            Self::Succeeded => "credential issuance succeeded (ready to send)",
            Self::Ack => "wallet acknowledged credential (saved)",
            Self::Other => "unrecognized event",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// An inbound issuance webhook body.
///
/// The whole JSON object is retained as the payload; the envelope fields
/// are read out of it once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuanceEvent {
    body: Value,
    kind: EventKind,
    event_type: Option<String>,
    txnid: Option<String>,
    wallet_did: Option<String>,
}

impl IssuanceEvent {
    /// Parse a raw request body.
    pub fn parse(raw: &[u8]) -> Result<Self, CorrelationError> {
        let body: Value = serde_json::from_slice(raw)
            .map_err(|e| CorrelationError::InvalidEvent(format!("body is not valid JSON: {e}")))?;
        Self::from_value(body)
    }

    /// Wrap an already-parsed body. Anything other than a JSON object is
    /// rejected, as is a `type` or `txnid` that is neither a string nor null.
    pub fn from_value(body: Value) -> Result<Self, CorrelationError> {
        if !body.is_object() {
            return Err(CorrelationError::InvalidEvent(
                "body must be a JSON object".into(),
            ));
        }
        let event_type = envelope_str(&body, "type")?;
        let txnid = envelope_str(&body, "txnid")?;
        let wallet_did = body.get("did").and_then(normalize_did);
        Ok(Self {
            kind: EventKind::from_type(event_type.as_deref()),
            event_type,
            txnid,
            wallet_did,
            body,
        })
    }

    /// The full event body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The raw `type`, if a non-blank string.
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// The correlation token (`txnid`), if a non-blank string.
    pub fn txnid(&self) -> Option<&str> {
        self.txnid.as_deref()
    }

    /// The normalized wallet subject DID carried in a top-level `did` field.
    pub fn wallet_did(&self) -> Option<&str> {
        self.wallet_did.as_deref()
    }

    /// CloudEvents `source`.
    pub fn source(&self) -> Option<&str> {
        self.body.get("source").and_then(Value::as_str)
    }

    /// CloudEvents `time`.
    pub fn time(&self) -> Option<&str> {
        self.body.get("time").and_then(Value::as_str)
    }

    /// Whether the body carries the CloudEvents `specversion` attribute.
    pub fn is_cloud_event(&self) -> bool {
        self.body.get("specversion").is_some() && self.event_type.is_some()
    }
}

/// Read a string envelope attribute. Missing, null and blank values are
/// absent; any other non-string value is malformed.
fn envelope_str(body: &Value, key: &str) -> Result<Option<String>, CorrelationError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(CorrelationError::InvalidEvent(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}
