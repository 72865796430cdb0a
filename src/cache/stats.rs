//! Cached aggregate statistics: the global tech-square counters and the
//! per-user dashboard counters.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, json};

use crate::domain::{TechSquareStats, UserDocumentStats};

use super::client::KvStore;
use super::error::QueryError;
use super::keys::CacheKey;
use super::meta::CachedResult;
use super::service::CacheService;

#[derive(Clone)]
pub struct StatsCache {
    service: CacheService,
}

impl StatsCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            service: CacheService::new(kv),
        }
    }

    pub async fn tech_square_stats<F, Fut>(
        &self,
        query: F,
    ) -> Result<CachedResult<TechSquareStats>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TechSquareStats, QueryError>>,
    {
        let key = CacheKey::TechSquareStats;
        self.service
            .fetch(&key, key.family().default_ttl_secs(), Map::new(), query)
            .await
    }

    pub async fn user_stats<F, Fut>(
        &self,
        user_id: i64,
        query: F,
    ) -> Result<CachedResult<UserDocumentStats>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<UserDocumentStats, QueryError>>,
    {
        let key = CacheKey::UserStats { user_id };
        let mut extras = Map::new();
        extras.insert("user_id".to_owned(), json!(user_id));
        self.service
            .fetch(&key, key.family().default_ttl_secs(), extras, query)
            .await
    }
}
