//! # Verification Relay
//!
//! The wallet provider posts every verifier interaction event to
//! `POST /verify`. A `*succeeded*` event opens the door exactly once; any
//! other event is acknowledged without side effect. Accepted messages are
//! buffered so that a polling consumer can read them from
//! `GET /verify/topics`.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::extractors::parse_json;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Substring of the verifier event type that signals a successful presentation.
const SUCCEEDED_MARKER: &str = "succeeded";

/// 202 body for verification events that do not open the door.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotOpenedResponse {
    pub ok: bool,
    pub opened: bool,
}

/// 404 body of `GET /verify/topics` on an empty buffer.
#[derive(Debug, Serialize, Deserialize)]
pub struct NoTopicResponse {
    pub error: String,
}

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify", post(verify))
        .route("/verify/topics", get(check_topics))
}

/// POST /verify: relay a verifier event.
///
/// 204 once the door endpoint accepted the open request, 202 for events
/// that do not open the door, 400 when the body is not JSON or lacks a
/// string `type`, 502 when the door endpoint fails.
async fn verify(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
    body: Bytes,
) -> Result<Response, AppError> {
    let message: Value = parse_json(&body)?;
    let event_type = message
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("verification event requires a string type".into()))?
        .to_string();

    let raw = String::from_utf8_lossy(&body).into_owned();
    tracing::info!(topic = %raw, "received topic message");
    if state.topics.push(raw).is_some() {
        tracing::debug!(capacity = state.topics.capacity(), "topic buffer full; dropped oldest");
    }

    if !event_type.contains(SUCCEEDED_MARKER) {
        tracing::info!(event_type = %event_type, "not verified; door stays closed");
        return Ok((
            StatusCode::ACCEPTED,
            Json(NotOpenedResponse {
                ok: true,
                opened: false,
            }),
        )
            .into_response());
    }

    match state.door.open().await {
        Ok(door) => {
            metrics.record_door(true);
            tracing::info!(
                event_type = %event_type,
                status = door.status,
                "verified; door opened"
            );
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Err(e) => {
            metrics.record_door(false);
            tracing::error!(event_type = %event_type, error = %e, "door request failed");
            Err(AppError::BadGateway(format!("door action failed: {e}")))
        }
    }
}

/// GET /verify/topics: remove and return the oldest buffered message.
///
/// On an empty buffer, waits `topic_timeout_ms` once before answering 404.
async fn check_topics(State(state): State<AppState>) -> Response {
    if let Some(message) = state.topics.pop() {
        return message.into_response();
    }

    tokio::time::sleep(Duration::from_millis(state.config.topic_timeout_ms)).await;

    match state.topics.pop() {
        Some(message) => message.into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(NoTopicResponse {
                error: "no topic found in queue".into(),
            }),
        )
            .into_response(),
    }
}
