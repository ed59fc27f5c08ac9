use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CacheTtlConfig;
use crate::db::{MessageRecord, UserProfile};
use crate::error::AppError;

// ============================================================================
// Cache backend
// ============================================================================

/// Low-level cache backend: byte values with per-key TTLs.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("Connecting to Redis...");
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        info!("Redis connection established");

        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        // ConnectionManager is cheap to clone and reconnects on its own
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

// ============================================================================
// Keys
// ============================================================================

/// Canonical cache key for a user pair: the two ids are sorted so that
/// both participants resolve to the same key regardless of direction.
fn pair_suffix(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

pub fn conversation_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = pair_suffix(a, b);
    format!("messages:{}:{}", lo, hi)
}

pub fn profile_key(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

pub fn message_count_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = pair_suffix(a, b);
    format!("message_count:{}:{}", lo, hi)
}

pub fn last_message_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = pair_suffix(a, b);
    format!("last_message:{}:{}", lo, hi)
}

pub fn conversation_list_key(user_id: Uuid) -> String {
    format!("conversations:{}", user_id)
}

// ============================================================================
// Policy layer
// ============================================================================

/// Cache-aside policy on top of a [`CacheStore`].
///
/// Every cache failure is logged and swallowed: a broken cache degrades
/// to a miss, it never fails the request.
#[derive(Clone)]
pub struct ConversationCache {
    store: Arc<dyn CacheStore>,
    ttl: CacheTtlConfig,
}

impl ConversationCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: CacheTtlConfig) -> Self {
        Self { store, ttl }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    debug!(key = %key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                    self.delete_quiet(key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache serialization failed");
                return;
            }
        };
        if let Err(e) = self.store.set(key, bytes, ttl_secs).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    async fn delete_quiet(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }

    // ------------------------------------------------------------------
    // Conversation history
    // ------------------------------------------------------------------

    pub async fn get_conversation(&self, a: Uuid, b: Uuid) -> Option<Vec<MessageRecord>> {
        self.get_json(&conversation_key(a, b)).await
    }

    pub async fn store_conversation(&self, a: Uuid, b: Uuid, messages: &[MessageRecord]) {
        self.set_json(&conversation_key(a, b), &messages, self.ttl.conversation_secs)
            .await;
    }

    // ------------------------------------------------------------------
    // User profiles
    // ------------------------------------------------------------------

    pub async fn get_profile(&self, user_id: Uuid) -> Option<UserProfile> {
        self.get_json(&profile_key(user_id)).await
    }

    pub async fn store_profile(&self, profile: &UserProfile) {
        self.set_json(&profile_key(profile.id), profile, self.ttl.profile_secs)
            .await;
    }

    // ------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------

    pub async fn store_message_count(&self, a: Uuid, b: Uuid, count: usize) {
        self.set_json(&message_count_key(a, b), &count, self.ttl.message_count_secs)
            .await;
    }

    pub async fn store_last_message(&self, a: Uuid, b: Uuid, message: &MessageRecord) {
        self.set_json(&last_message_key(a, b), message, self.ttl.last_message_secs)
            .await;
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Drop every derived value that a write between `a` and `b` can
    /// make stale: history, count, last message, and both users'
    /// conversation lists. Each delete is independent and best-effort.
    pub async fn invalidate_pair(&self, a: Uuid, b: Uuid) {
        self.delete_quiet(&conversation_key(a, b)).await;
        self.delete_quiet(&message_count_key(a, b)).await;
        self.delete_quiet(&last_message_key(a, b)).await;
        self.delete_quiet(&conversation_list_key(a)).await;
        self.delete_quiet(&conversation_list_key(b)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_keys_are_direction_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(conversation_key(a, b), conversation_key(b, a));
        assert_eq!(message_count_key(a, b), message_count_key(b, a));
        assert_eq!(last_message_key(a, b), last_message_key(b, a));
    }

    #[test]
    fn pair_keys_use_sorted_ids() {
        let lo = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        let hi = Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap();

        let key = conversation_key(hi, lo);
        assert_eq!(key, format!("messages:{}:{}", lo, hi));
    }

    #[test]
    fn per_user_keys_differ_between_users() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_ne!(conversation_list_key(a), conversation_list_key(b));
        assert_ne!(profile_key(a), profile_key(b));
    }
}
