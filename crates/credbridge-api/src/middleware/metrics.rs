//! # Bridge Metrics
//!
//! In-process counters for the webhook service. The middleware counts every
//! API request and every 4xx/5xx answer; the handlers record what each
//! notification led to: a registry write, a deferral or skip keyed by its
//! reason, or a door request. The counters are shared through an
//! `axum::Extension` so that tests can read them back.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use serde::Serialize;

use credbridge_issuance::IssueOutcome;

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    rejected_events: AtomicU64,
    credentials_stored: AtomicU64,
    doors_opened: AtomicU64,
    door_failures: AtomicU64,
    /// Deferred and skipped `/issue` answers, by reported reason.
    not_stored: Mutex<BTreeMap<String, u64>>,
}

/// Cloneable handle to the service counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    counters: Arc<Counters>,
}

/// Point-in-time copy of [`ApiMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub rejected_events: u64,
    pub credentials_stored: u64,
    pub doors_opened: u64,
    pub door_failures: u64,
    pub not_stored: BTreeMap<String, u64>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests handled so far.
    pub fn requests(&self) -> u64 {
        self.counters.requests.load(Ordering::Relaxed)
    }

    /// Requests answered with a 4xx or 5xx status.
    pub fn errors(&self) -> u64 {
        self.counters.errors.load(Ordering::Relaxed)
    }

    /// Record the outcome of one correlated issuance notification.
    pub fn record_issue(&self, outcome: &IssueOutcome) {
        match outcome.reason() {
            None => {
                self.counters.credentials_stored.fetch_add(1, Ordering::Relaxed);
            }
            Some(reason) => {
                *self
                    .counters
                    .not_stored
                    .lock()
                    .entry(reason.to_string())
                    .or_default() += 1;
            }
        }
    }

    /// Record an issuance notification refused before correlation.
    pub fn record_rejected_event(&self) {
        self.counters.rejected_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the result of one door request.
    pub fn record_door(&self, opened: bool) {
        let counter = if opened {
            &self.counters.doors_opened
        } else {
            &self.counters.door_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Deferred or skipped `/issue` answers reported with `reason`.
    pub fn not_stored(&self, reason: &str) -> u64 {
        self.counters
            .not_stored
            .lock()
            .get(reason)
            .copied()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            rejected_events: c.rejected_events.load(Ordering::Relaxed),
            credentials_stored: c.credentials_stored.load(Ordering::Relaxed),
            doors_opened: c.doors_opened.load(Ordering::Relaxed),
            door_failures: c.door_failures.load(Ordering::Relaxed),
            not_stored: c.not_stored.lock().clone(),
        }
    }
}

/// Middleware that counts requests and error statuses.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.counters.requests.fetch_add(1, Ordering::Relaxed);
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            m.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
    response
}
