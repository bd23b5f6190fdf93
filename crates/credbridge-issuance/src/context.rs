//! Correlation context for events that arrive without a token.
//!
//! Wallets frequently post their DID without the issuer's `txnid`. Such an
//! event is attributed to the most recently observed token. The context
//! keeps a bounded window of recent tokens so that finalizing one flow
//! falls back to the flow seen before it rather than to nothing.
//!
//! Two token-less flows that interleave will still be merged. The window
//! narrows that hazard; it cannot close it.

use std::collections::VecDeque;

/// Default number of recent tokens and subject hints retained.
pub const DEFAULT_WINDOW: usize = 16;

/// A subject DID observed for a token (or for no token at all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectHint {
    pub token: Option<String>,
    pub subject_did: String,
}

/// Bounded recent-token window and subject hints.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    capacity: usize,
    recent: VecDeque<String>,
    hints: VecDeque<SubjectHint>,
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl CorrelationContext {
    /// A context retaining at most `capacity` tokens and hints (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            recent: VecDeque::with_capacity(capacity),
            hints: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `token` as the most recently seen.
    pub fn observe_token(&mut self, token: &str) {
        self.recent.retain(|t| t != token);
        self.recent.push_back(token.to_string());
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }

    /// The most recently observed token still in the window.
    pub fn last_token(&self) -> Option<&str> {
        self.recent.back().map(String::as_str)
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.recent.iter().any(|t| t == token)
    }

    /// Record that `subject_did` was observed for `token`.
    pub fn record_subject(&mut self, token: Option<&str>, subject_did: &str) {
        self.hints.retain(|h| h.token.as_deref() != token);
        self.hints.push_back(SubjectHint {
            token: token.map(str::to_string),
            subject_did: subject_did.to_string(),
        });
        while self.hints.len() > self.capacity {
            self.hints.pop_front();
        }
    }

    /// The subject DID recorded for exactly `token`. A token-less lookup
    /// matches only a token-less hint.
    pub fn subject_hint(&self, token: Option<&str>) -> Option<&str> {
        self.hints
            .iter()
            .rev()
            .find(|h| h.token.as_deref() == token)
            .map(|h| h.subject_did.as_str())
    }

    /// Drop every trace of `token` after its flow has finalized.
    pub fn forget(&mut self, token: Option<&str>) {
        if let Some(token) = token {
            self.recent.retain(|t| t != token);
        }
        self.hints.retain(|h| h.token.as_deref() != token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_token_tracks_most_recent() {
        let mut ctx = CorrelationContext::new(4);
        assert!(ctx.last_token().is_none());
        ctx.observe_token("A");
        ctx.observe_token("B");
        assert_eq!(ctx.last_token(), Some("B"));
        ctx.observe_token("A");
        assert_eq!(ctx.last_token(), Some("A"));
    }

    #[test]
    fn window_is_bounded() {
        let mut ctx = CorrelationContext::new(2);
        ctx.observe_token("A");
        ctx.observe_token("B");
        ctx.observe_token("C");
        assert!(!ctx.contains_token("A"));
        assert!(ctx.contains_token("B"));
    }

    #[test]
    fn forgetting_falls_back_to_previous_token() {
        let mut ctx = CorrelationContext::default();
        ctx.observe_token("A");
        ctx.observe_token("B");
        ctx.forget(Some("B"));
        assert_eq!(ctx.last_token(), Some("A"));
    }

    #[test]
    fn hints_match_token_exactly() {
        let mut ctx = CorrelationContext::default();
        ctx.record_subject(Some("A"), "example:alice");
        ctx.record_subject(None, "example:anon");
        assert_eq!(ctx.subject_hint(Some("A")), Some("example:alice"));
        assert_eq!(ctx.subject_hint(None), Some("example:anon"));
        assert_eq!(ctx.subject_hint(Some("B")), None);

        ctx.record_subject(Some("A"), "example:alice2");
        assert_eq!(ctx.subject_hint(Some("A")), Some("example:alice2"));

        ctx.forget(Some("A"));
        assert_eq!(ctx.subject_hint(Some("A")), None);
        assert_eq!(ctx.subject_hint(None), Some("example:anon"));
        ctx.forget(None);
        assert_eq!(ctx.subject_hint(None), None);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut ctx = CorrelationContext::new(0);
        assert_eq!(ctx.capacity(), 1);
        ctx.observe_token("A");
        assert_eq!(ctx.last_token(), Some("A"));
    }
}
