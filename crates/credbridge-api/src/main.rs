//! # credbridge-api -- Binary Entry Point
//!
//! Loads configuration from the environment, wires the registry and door
//! clients into the issuance correlator, and serves the webhook router on
//! `WEBHOOK_PORT` (default 3000).

use std::sync::Arc;
use std::time::Duration;

use credbridge_api::state::{AppConfig, AppState, LedgerKind};
use credbridge_client::{
    CredentialLedger, DoorConfig, HttpDoorClient, InMemoryRegistry, RegistryConfig, RpcRegistry,
};
use credbridge_issuance::IssuanceCorrelator;

/// Upper bound on the pending-entry sweep interval.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid service configuration: {e}");
        e
    })?;

    let door_config = DoorConfig::from_env().map_err(|e| {
        tracing::error!("Door client not configured: {e}");
        e
    })?;
    tracing::info!(url = %door_config.url, "door client configured");
    let door = HttpDoorClient::new(door_config)?;

    let ledger: Arc<dyn CredentialLedger> = match config.ledger {
        LedgerKind::Rpc => {
            let registry_config = RegistryConfig::from_env().map_err(|e| {
                tracing::error!("Registry client not configured: {e}");
                e
            })?;
            tracing::info!(
                rpc = %registry_config.rpc_url,
                registry = %registry_config.registry_address,
                chain_id = registry_config.chain_id,
                "registry client configured"
            );
            Arc::new(RpcRegistry::new(registry_config)?)
        }
        LedgerKind::Memory => {
            tracing::warn!("Using the in-memory registry; stored credentials are lost on restart");
            Arc::new(InMemoryRegistry::new())
        }
    };

    let state = AppState::new(config.clone(), ledger, Arc::new(door));

    if let Some(ttl) = config.pending_ttl() {
        spawn_pending_sweeper(state.correlator.clone(), ttl.min(MAX_SWEEP_INTERVAL));
    }

    let app = credbridge_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("credbridge webhook listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically evict pending issuances that outlived their TTL.
fn spawn_pending_sweeper(correlator: Arc<IssuanceCorrelator>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = correlator.sweep_expired();
            if evicted > 0 {
                tracing::info!(evicted, "expired pending issuances evicted");
            }
        }
    });
}
