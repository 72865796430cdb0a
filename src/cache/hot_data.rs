//! Cached hot and latest document strips for the catalog landing page.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, json};

use crate::domain::HotDocumentsPage;

use super::client::KvStore;
use super::error::QueryError;
use super::keys::CacheKey;
use super::meta::CachedResult;
use super::service::CacheService;

#[derive(Clone)]
pub struct HotDataCache {
    service: CacheService,
}

impl HotDataCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            service: CacheService::new(kv),
        }
    }

    pub async fn hot_documents<F, Fut>(
        &self,
        limit: u32,
        query: F,
    ) -> Result<CachedResult<HotDocumentsPage>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HotDocumentsPage, QueryError>>,
    {
        let key = CacheKey::HotDocuments { limit };
        let mut extras = Map::new();
        extras.insert("limit".to_owned(), json!(limit));
        self.service
            .fetch(&key, key.family().default_ttl_secs(), extras, query)
            .await
    }

    pub async fn latest_documents<F, Fut>(
        &self,
        limit: u32,
        query: F,
    ) -> Result<CachedResult<HotDocumentsPage>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HotDocumentsPage, QueryError>>,
    {
        let key = CacheKey::LatestDocuments { limit };
        let mut extras = Map::new();
        extras.insert("limit".to_owned(), json!(limit));
        self.service
            .fetch(&key, key.family().default_ttl_secs(), extras, query)
            .await
    }
}
