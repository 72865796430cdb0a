//! Cached keyword search over the public catalog.
//!
//! The raw keyword never reaches a cache key; it is collapsed through
//! [`fingerprint`](super::keys::fingerprint) so `"Rust"`, `" rust "` and
//! `"RUST"` share one entry.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, json};

use crate::domain::{FileType, SearchResultsPage};

use super::client::KvStore;
use super::error::QueryError;
use super::keys::{CacheKey, fingerprint};
use super::meta::CachedResult;
use super::service::CacheService;

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub keyword: String,
    pub page: u32,
    pub size: u32,
    pub file_type: Option<FileType>,
}

#[derive(Clone)]
pub struct SearchCache {
    service: CacheService,
}

impl SearchCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            service: CacheService::new(kv),
        }
    }

    pub async fn search<F, Fut>(
        &self,
        params: &SearchParams,
        query: F,
    ) -> Result<CachedResult<SearchResultsPage>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SearchResultsPage, QueryError>>,
    {
        let key = CacheKey::Search {
            keyword: params.keyword.clone(),
            page: params.page,
            size: params.size,
            file_type: params.file_type,
        };
        let mut extras = Map::new();
        extras.insert("keyword".to_owned(), json!(params.keyword));
        extras.insert(
            "keyword_hash".to_owned(),
            json!(fingerprint(&params.keyword)),
        );
        extras.insert("page".to_owned(), json!(params.page));
        extras.insert("size".to_owned(), json!(params.size));
        self.service
            .fetch(&key, key.family().default_ttl_secs(), extras, query)
            .await
    }
}
