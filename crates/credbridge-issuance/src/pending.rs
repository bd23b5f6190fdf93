//! Pending-issuance store.
//!
//! Partial observations for an in-flight issuance are held here, keyed by
//! correlation token, until the correlator finalizes or the sweeper evicts
//! them. The map lock is never held across an `.await`; per-token ordering
//! is enforced one level up by the correlator's token locks.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

/// Partial state for one correlation token.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    /// Body of the `oidc-interaction-succeeded` event.
    pub succeeded_payload: Option<Value>,
    /// Body of the wallet acknowledgement.
    pub ack_payload: Option<Value>,
    pub ack_received: bool,
    /// Normalized subject DID posted by the wallet.
    pub subject_did: Option<String>,
    pub created_at: Instant,
    pub updated_at: Instant,
}

impl PendingEntry {
    fn new(now: Instant) -> Self {
        Self {
            succeeded_payload: None,
            ack_payload: None,
            ack_received: false,
            subject_did: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Token-keyed map of [`PendingEntry`].
#[derive(Debug, Default)]
pub struct PendingStore {
    entries: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the entry for `token`.
    pub fn get(&self, token: &str) -> Option<PendingEntry> {
        self.entries.lock().get(token).cloned()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.lock().contains_key(token)
    }

    /// Get-or-create the entry for `token`, apply `f`, bump `updated_at`,
    /// and return a snapshot of the result.
    pub fn upsert(&self, token: &str, f: impl FnOnce(&mut PendingEntry)) -> PendingEntry {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(token.to_string())
            .or_insert_with(|| PendingEntry::new(now));
        f(entry);
        entry.updated_at = now;
        entry.clone()
    }

    /// Remove and return the entry for `token`.
    pub fn remove(&self, token: &str) -> Option<PendingEntry> {
        self.entries.lock().remove(token)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict entries idle for longer than `ttl`. Returns the evicted tokens.
    pub fn sweep_expired(&self, ttl: Duration) -> Vec<String> {
        self.sweep_expired_at(Instant::now(), ttl)
    }

    /// [`PendingStore::sweep_expired`] against an explicit clock reading.
    pub fn sweep_expired_at(&self, now: Instant, ttl: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        self.entries.lock().retain(|token, entry| {
            let keep = now.saturating_duration_since(entry.updated_at) <= ttl;
            if !keep {
                evicted.push(token.clone());
            }
            keep
        });
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_creates_then_updates() {
        let store = PendingStore::new();
        let first = store.upsert("T1", |e| e.succeeded_payload = Some(json!({ "a": 1 })));
        assert!(!first.ack_received);

        let second = store.upsert("T1", |e| e.ack_received = true);
        assert!(second.ack_received);
        assert_eq!(second.succeeded_payload, Some(json!({ "a": 1 })));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_deletes_once() {
        let store = PendingStore::new();
        store.upsert("T1", |_| {});
        assert!(store.remove("T1").is_some());
        assert!(store.remove("T1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_evicts_only_idle_entries() {
        let store = PendingStore::new();
        store.upsert("old", |_| {});
        std::thread::sleep(Duration::from_millis(5));
        let fresh = store.upsert("fresh", |_| {});
        let ttl = Duration::from_secs(60);

        assert!(store.sweep_expired(ttl).is_empty());

        let evicted = store.sweep_expired_at(fresh.updated_at + ttl, ttl);
        assert_eq!(evicted, vec!["old".to_string()]);
        assert!(store.contains("fresh"));
    }
}
