//! # Issuance Endpoints
//!
//! `POST /issue` feeds each wallet-provider notification to the
//! [`IssuanceCorrelator`](credbridge_issuance::IssuanceCorrelator). Only
//! the notification that completes a flow produces a registry write and a
//! 201; everything else is acknowledged with 202 and a reason so that the
//! sender does not redeliver.
//!
//! ## Endpoints
//!
//! - `POST /issue`: correlate an issuance event.
//! - `POST /issue/status`: activate or revoke a stored credential.
//! - `GET /issue/health`: report the registry, signer and RPC endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use credbridge_client::registry::Address;
use credbridge_client::OnchainCredential;
use credbridge_core::CredentialHash;
use credbridge_issuance::{FinalizedCredential, IssuanceEvent, IssueOutcome, StoredCredential};

use crate::error::AppError;
use crate::extractors::{parse_validated_json, Validate};
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// 201 body for a credential written to the registry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub ok: bool,
    pub tx_hash: String,
    pub block_number: Option<u64>,
    #[serde(flatten)]
    pub record: FinalizedCredential,
    pub contract_exists: bool,
    pub is_active: bool,
    /// `null` when the read-back after the write failed.
    pub onchain_record: Option<OnchainCredential>,
}

impl From<StoredCredential> for IssueResponse {
    fn from(stored: StoredCredential) -> Self {
        Self {
            ok: true,
            tx_hash: stored.receipt.transaction_hash,
            block_number: stored.receipt.block_number,
            record: stored.record,
            contract_exists: stored.contract_exists,
            is_active: stored.is_active,
            onchain_record: stored.onchain_record,
        }
    }
}

/// 202 body for deferred and skipped events.
#[derive(Debug, Serialize, Deserialize)]
pub struct SkippedResponse {
    pub ok: bool,
    pub skipped: bool,
    pub reason: String,
}

/// Body of `POST /issue/status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub credential_hash: Option<String>,
    pub active: Option<bool>,
}

impl Validate for StatusRequest {
    fn validate(&self) -> Result<(), String> {
        match self.credential_hash.as_deref() {
            Some(hash) if hash.trim().starts_with("0x") => {}
            _ => return Err("credentialHash must be a non-empty 0x-prefixed string".into()),
        }
        if self.active.is_none() {
            return Err("active must be a boolean".into());
        }
        Ok(())
    }
}

/// 200 body of `POST /issue/status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub ok: bool,
    pub tx_hash: String,
    pub credential_hash: CredentialHash,
    pub exists: bool,
    pub is_active: bool,
}

/// 200 body of `GET /issue/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub registry: Address,
    pub issuer: Address,
    pub rpc: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the issuance router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/issue", post(issue))
        .route("/issue/status", post(update_status))
        .route("/issue/health", get(health))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /issue: correlate one issuance notification.
///
/// 201 with the finalized record when the flow completes, 202
/// `{ok, skipped, reason}` otherwise, 400 on malformed input or when the
/// registry write fails (the pending entry is kept for redelivery).
async fn issue(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
    body: Bytes,
) -> Result<Response, AppError> {
    let event = IssuanceEvent::parse(&body).map_err(|e| {
        tracing::warn!(error = %e, "rejecting malformed issuance event");
        metrics.record_rejected_event();
        e
    })?;

    let outcome = state.correlator.handle(event).await.map_err(|e| {
        tracing::error!(error = %e, "/issue failed");
        e
    })?;
    metrics.record_issue(&outcome);

    let response = match outcome {
        IssueOutcome::Stored(stored) => (
            StatusCode::CREATED,
            Json(IssueResponse::from(*stored)),
        )
            .into_response(),
        other => {
            let reason = other.reason().unwrap_or_default().to_string();
            (
                StatusCode::ACCEPTED,
                Json(SkippedResponse {
                    ok: true,
                    skipped: true,
                    reason,
                }),
            )
                .into_response()
        }
    };
    Ok(response)
}

/// POST /issue/status: set a stored credential's active flag.
async fn update_status(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusResponse>, AppError> {
    let req: StatusRequest = parse_validated_json(&body)?;
    let credential_hash = CredentialHash::parse(req.credential_hash.as_deref().unwrap_or_default())?;
    let active = req.active.unwrap_or_default();

    let ledger = state.ledger();
    let ledger_failure = |e: credbridge_client::ClientError| {
        tracing::error!(%credential_hash, error = %e, "/issue/status failed");
        AppError::BadRequest(e.to_string())
    };

    let receipt = ledger
        .set_credential_status(&credential_hash, active)
        .await
        .map_err(ledger_failure)?;
    let exists = ledger.exists(&credential_hash).await.map_err(ledger_failure)?;
    let is_active = ledger
        .is_active(&credential_hash)
        .await
        .map_err(ledger_failure)?;

    tracing::info!(
        %credential_hash,
        active = is_active,
        tx_hash = %receipt.transaction_hash,
        "credential status updated"
    );

    Ok(Json(StatusResponse {
        ok: true,
        tx_hash: receipt.transaction_hash,
        credential_hash,
        exists,
        is_active,
    }))
}

/// GET /issue/health: registry address, signer address and RPC endpoint.
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let ledger = state.ledger();
    let issuer = ledger
        .signer_address()
        .await
        .map_err(|e| AppError::Internal(format!("signer unavailable: {e}")))?;

    Ok(Json(HealthResponse {
        ok: true,
        registry: ledger.registry_address(),
        issuer,
        rpc: ledger.endpoint(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(hash: Option<&str>, active: Option<bool>) -> StatusRequest {
        StatusRequest {
            credential_hash: hash.map(str::to_string),
            active,
        }
    }

    #[test]
    fn status_request_requires_prefixed_hash() {
        assert!(request(None, Some(true)).validate().is_err());
        assert!(request(Some("abc"), Some(true)).validate().is_err());
        assert!(request(Some(" 0xabc"), Some(true)).validate().is_ok());
    }

    #[test]
    fn status_request_requires_boolean_active() {
        let err = request(Some("0x00"), None).validate().unwrap_err();
        assert_eq!(err, "active must be a boolean");
    }
}
