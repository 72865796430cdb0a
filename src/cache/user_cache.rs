//! Plain get/put cache for user profiles.
//!
//! Unlike the endpoint families this is not read-through: the auth
//! collaborator owns the lookup and calls `put_user` explicitly after a
//! database read. Keys live under the configurable `CACHE_KEY_PREFIX`
//! namespace and the TTL comes from settings.

use std::sync::Arc;

use tracing::warn;

use crate::config::CacheSettings;
use crate::domain::CachedUser;

use super::client::KvStore;
use super::keys::CacheKey;

#[derive(Clone)]
pub struct UserCache {
    kv: Arc<dyn KvStore>,
    key_prefix: String,
    ttl_secs: u64,
}

impl UserCache {
    pub fn new(kv: Arc<dyn KvStore>, settings: &CacheSettings) -> Self {
        Self {
            kv,
            key_prefix: settings.key_prefix.clone(),
            ttl_secs: settings.user_cache_ttl_secs,
        }
    }

    fn key(&self, user_id: i64) -> String {
        CacheKey::User {
            key_prefix: self.key_prefix.clone(),
            user_id,
        }
        .render()
    }

    pub async fn get_user(&self, user_id: i64) -> Option<CachedUser> {
        let key = self.key(user_id);
        let raw = self.kv.get(&key).await?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(key = %key, error = %err, "cached user unreadable, dropping");
                self.kv.del(&key).await;
                None
            }
        }
    }

    /// Store a profile for the configured TTL. Returns whether the write
    /// stuck; callers treat `false` as a cache outage, not an error.
    pub async fn put_user(&self, user: &CachedUser) -> bool {
        let key = self.key(user.id);
        match serde_json::to_string(user) {
            Ok(raw) => self.kv.setex(&key, self.ttl_secs, &raw).await,
            Err(err) => {
                warn!(key = %key, error = %err, "user profile failed to serialize");
                false
            }
        }
    }

    pub async fn delete_user(&self, user_id: i64) -> bool {
        self.kv.del(&self.key(user_id)).await
    }

    /// Replace whatever is cached with the given profile.
    pub async fn refresh_user(&self, user: &CachedUser) -> bool {
        self.delete_user(user.id).await;
        self.put_user(user).await
    }

    pub async fn has_user(&self, user_id: i64) -> bool {
        self.kv.exists(&self.key(user_id)).await
    }
}
