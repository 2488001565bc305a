//! Session storage.
//!
//! A session record maps `session:{user_id}` to the one token currently
//! authoritative for that user. Stores only ever do point reads,
//! unconditional overwrites and deletes; the last `set` for a key wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::PgPool;
use tracing::debug;

use super::AuthError;

/// Build the store key for a user's session.
pub fn session_key(user_id: &str) -> String {
    format!("session:{user_id}")
}

/// Key-value store holding one token per key with a TTL in whole seconds.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write `token` under `key`, replacing any previous value.
    async fn set(&self, key: &str, token: &str, ttl_secs: u64) -> Result<(), AuthError>;

    /// Read the live value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), AuthError>;
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Clone)]
struct StoredToken {
    token: String,
    expires_at: Instant,
}

/// In-process session store with per-entry expiry.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, StoredToken>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries.retain(|_, v| v.expires_at > now);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}

fn ttl_out_of_range(ttl_secs: u64) -> AuthError {
    AuthError::ValidationError(format!("session ttl out of range: {ttl_secs}"))
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, token: &str, ttl_secs: u64) -> Result<(), AuthError> {
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| ttl_out_of_range(ttl_secs))?;
        self.entries.insert(
            key.to_string(),
            StoredToken {
                token: token.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let live = self.entries.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.token.clone())
            } else {
                None
            }
        });
        if live.is_none() {
            // Drop the stale entry, unless a fresh set raced in.
            self.entries
                .remove_if(key, |_, v| v.expires_at <= Instant::now());
        }
        Ok(live)
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        self.entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// PostgreSQL store
// =============================================================================

/// Session store backed by the `sessions` table.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete expired rows, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "purged expired sessions");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn set(&self, key: &str, token: &str, ttl_secs: u64) -> Result<(), AuthError> {
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| ttl_out_of_range(ttl_secs))?;
        sqlx::query(
            "INSERT INTO sessions (key, token, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO UPDATE \
             SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT token FROM sessions WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
