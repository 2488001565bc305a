//! Pending OAuth authorizations, keyed by the CSRF `state` parameter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default TTL for pending state entries (10 minutes).
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// Pending authorization stored between authorize and callback.
#[derive(Debug, Clone)]
pub struct OAuthPendingState {
    pub provider: String,
    pub redirect_uri: String,
    pub created_at: Instant,
}

impl OAuthPendingState {
    pub fn new(provider: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            redirect_uri: redirect_uri.into(),
            created_at: Instant::now(),
        }
    }
}

/// In-memory store for pending OAuth state.
pub struct OAuthStateStore {
    states: DashMap<String, OAuthPendingState>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::with_ttl(STATE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Insert a pending state entry.
    pub fn insert(&self, state_key: String, pending: OAuthPendingState) {
        self.states.insert(state_key, pending);
    }

    /// Take (remove and return) a pending state entry.
    /// Returns `None` if not found or expired.
    pub fn take(&self, state_key: &str) -> Option<OAuthPendingState> {
        let (_, pending) = self.states.remove(state_key)?;
        if pending.created_at.elapsed() > self.ttl {
            return None;
        }
        Some(pending)
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        self.states
            .retain(|_, v| v.created_at.elapsed() <= self.ttl);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT_TTL: Duration = Duration::from_millis(20);

    fn pending() -> OAuthPendingState {
        OAuthPendingState::new("google", "http://localhost/callback")
    }

    #[test]
    fn insert_and_take_once() {
        let store = OAuthStateStore::new();
        store.insert("k".into(), OAuthPendingState::new("github", "http://localhost/cb"));

        let taken = store.take("k").expect("present");
        assert_eq!(taken.provider, "github");
        assert_eq!(taken.redirect_uri, "http://localhost/cb");
        assert!(store.take("k").is_none(), "state is single-use");
    }

    #[test]
    fn unknown_key_returns_none() {
        let store = OAuthStateStore::new();
        assert!(store.take("never-issued").is_none());
    }

    #[tokio::test]
    async fn expired_entry_returns_none() {
        let store = OAuthStateStore::with_ttl(SHORT_TTL);
        store.insert("old".into(), pending());
        tokio::time::sleep(SHORT_TTL * 3).await;
        assert!(store.take("old").is_none());
    }

    #[tokio::test]
    async fn cleanup_removes_expired() {
        let store = OAuthStateStore::with_ttl(SHORT_TTL);
        store.insert("stale".into(), pending());
        tokio::time::sleep(SHORT_TTL * 3).await;
        store.insert("fresh".into(), pending());
        store.cleanup();
        assert_eq!(store.states.len(), 1);
        assert!(store.take("fresh").is_some());
    }

    #[tokio::test]
    async fn spawn_cleanup_task_runs() {
        let store = Arc::new(OAuthStateStore::with_ttl(SHORT_TTL));
        store.insert("stale".into(), pending());
        tokio::time::sleep(SHORT_TTL * 3).await;
        let handle = store.spawn_cleanup_task();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(store.states.is_empty());
    }
}
