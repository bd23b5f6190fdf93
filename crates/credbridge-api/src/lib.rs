//! # credbridge-api -- Webhook service for credbridge
//!
//! Receives wallet issuance and verification notifications and turns them
//! into the bridge's two side effects: a credential written to the on-chain
//! registry, and a door opened after a successful presentation.
//!
//! ## API Surface
//!
//! | Route                  | Module              | Purpose                        |
//! |------------------------|---------------------|--------------------------------|
//! | `POST /issue`          | [`routes::issue`]   | Issuance event correlation     |
//! | `POST /issue/status`   | [`routes::issue`]   | Credential revocation toggle   |
//! | `GET /issue/health`    | [`routes::issue`]   | Registry signer and endpoint   |
//! | `POST /verify`         | [`routes::verify`]  | Verification relay to the door |
//! | `GET /verify/topics`   | [`routes::verify`]  | Drain buffered verifier events |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Webhooks are unauthenticated; the service is expected to sit behind the
//! wallet provider's network boundary.

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod topics;

use axum::middleware::from_fn;
use axum::Router;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// Like [`app`], counting requests into a caller-owned [`ApiMetrics`].
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let api = Router::new()
        .merge(routes::issue::router())
        .merge(routes::verify::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(metrics))
        .with_state(state);

    // Health probes stay outside the metrics layer.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the router is serving.
async fn readiness() -> &'static str {
    "ready"
}
