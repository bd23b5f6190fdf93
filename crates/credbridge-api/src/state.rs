//! # Application State
//!
//! Shared state for the Axum application. Everything mutable lives behind
//! an `Arc`, so cloning [`AppState`] into each handler is cheap.
//!
//! The pending-issuance map, correlation context and topic buffer are
//! in-memory only and are lost on restart.

use std::sync::Arc;
use std::time::Duration;

use credbridge_client::{ConfigError, CredentialLedger, DoorAction};
use credbridge_issuance::{CorrelatorConfig, IssuanceCorrelator};

use crate::topics::TopicBuffer;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOPICS_SIZE: usize = 5000;
const DEFAULT_TOPIC_TIMEOUT_MS: u64 = 100;
const DEFAULT_PENDING_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_CORRELATION_WINDOW: usize = 16;

/// Which registry implementation backs `/issue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerKind {
    /// Ethereum JSON-RPC against the deployed registry contract.
    #[default]
    Rpc,
    /// In-process registry for local development.
    Memory,
}

impl std::str::FromStr for LedgerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpc" => Ok(Self::Rpc),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("CREDBRIDGE_LEDGER".into(), s.to_string())),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to (`WEBHOOK_PORT`).
    pub port: u16,
    /// Maximum buffered verification messages (`TOPICS_SIZE`).
    pub topics_size: usize,
    /// How long `GET /verify/topics` waits on an empty buffer (`TOPIC_TIMEOUT_MS`).
    pub topic_timeout_ms: u64,
    /// Idle lifetime of pending issuances in seconds; 0 disables eviction
    /// (`PENDING_TTL_SECS`).
    pub pending_ttl_secs: u64,
    /// Recent tokens remembered for token-less events (`CORRELATION_WINDOW`).
    pub correlation_window: usize,
    /// Registry backend (`CREDBRIDGE_LEDGER`).
    pub ledger: LedgerKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            topics_size: DEFAULT_TOPICS_SIZE,
            topic_timeout_ms: DEFAULT_TOPIC_TIMEOUT_MS,
            pending_ttl_secs: DEFAULT_PENDING_TTL_SECS,
            correlation_window: DEFAULT_CORRELATION_WINDOW,
            ledger: LedgerKind::Rpc,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let ledger = match lookup("CREDBRIDGE_LEDGER").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.parse()?,
            None => defaults.ledger,
        };
        let config = Self {
            port: parse_or(&lookup, "WEBHOOK_PORT", defaults.port)?,
            topics_size: parse_or(&lookup, "TOPICS_SIZE", defaults.topics_size)?,
            topic_timeout_ms: parse_or(&lookup, "TOPIC_TIMEOUT_MS", defaults.topic_timeout_ms)?,
            pending_ttl_secs: parse_or(&lookup, "PENDING_TTL_SECS", defaults.pending_ttl_secs)?,
            correlation_window: parse_or(
                &lookup,
                "CORRELATION_WINDOW",
                defaults.correlation_window,
            )?,
            ledger,
        };
        if config.topics_size == 0 {
            return Err(ConfigError::Invalid("TOPICS_SIZE".into(), "0".into()));
        }
        Ok(config)
    }

    /// Pending-entry TTL, or `None` when eviction is disabled.
    pub fn pending_ttl(&self) -> Option<Duration> {
        (self.pending_ttl_secs > 0).then(|| Duration::from_secs(self.pending_ttl_secs))
    }

    /// Correlator settings derived from this configuration.
    pub fn correlator_config(&self) -> CorrelatorConfig {
        CorrelatorConfig {
            pending_ttl: self.pending_ttl(),
            correlation_window: self.correlation_window,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(var.to_string(), raw)),
        None => Ok(default),
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Issuance reconciliation; owns the registry client.
    pub correlator: Arc<IssuanceCorrelator>,
    /// Door opened on successful verification.
    pub door: Arc<dyn DoorAction>,
    /// Recent verification messages for `GET /verify/topics`.
    pub topics: TopicBuffer,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        ledger: Arc<dyn CredentialLedger>,
        door: Arc<dyn DoorAction>,
    ) -> Self {
        let correlator = IssuanceCorrelator::new(ledger, config.correlator_config());
        Self {
            correlator: Arc::new(correlator),
            door,
            topics: TopicBuffer::new(config.topics_size),
            config,
        }
    }

    /// The registry the correlator writes through.
    pub fn ledger(&self) -> &Arc<dyn CredentialLedger> {
        self.correlator.ledger()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.topics_size, 5000);
        assert_eq!(config.topic_timeout_ms, 100);
        assert_eq!(config.pending_ttl(), Some(Duration::from_secs(86_400)));
        assert_eq!(config.ledger, LedgerKind::Rpc);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(env(&[
            ("WEBHOOK_PORT", "8088"),
            ("TOPICS_SIZE", "3"),
            ("TOPIC_TIMEOUT_MS", "5"),
            ("PENDING_TTL_SECS", "0"),
            ("CORRELATION_WINDOW", "4"),
            ("CREDBRIDGE_LEDGER", "Memory"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.topics_size, 3);
        assert_eq!(config.topic_timeout_ms, 5);
        assert_eq!(config.pending_ttl(), None);
        assert_eq!(config.correlator_config().pending_ttl, None);
        assert_eq!(config.correlator_config().correlation_window, 4);
        assert_eq!(config.ledger, LedgerKind::Memory);
    }

    #[test]
    fn invalid_values_are_rejected() {
        match AppConfig::from_lookup(env(&[("WEBHOOK_PORT", "http")])) {
            Err(ConfigError::Invalid(var, raw)) => {
                assert_eq!(var, "WEBHOOK_PORT");
                assert_eq!(raw, "http");
            }
            other => panic!("expected Invalid(WEBHOOK_PORT), got {other:?}"),
        }
        assert!(AppConfig::from_lookup(env(&[("CREDBRIDGE_LEDGER", "sqlite")])).is_err());
        assert!(AppConfig::from_lookup(env(&[("TOPICS_SIZE", "0")])).is_err());
    }
}
