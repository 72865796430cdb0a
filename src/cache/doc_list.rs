//! Cached document lists: the public catalog and each user's own list.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, json};

use crate::domain::{DocumentListPage, FileType};

use super::client::KvStore;
use super::error::QueryError;
use super::keys::{CacheKey, SortBy, TimeFilter};
use super::meta::CachedResult;
use super::service::CacheService;

/// Query parameters of the public catalog list endpoint.
#[derive(Debug, Clone, Default)]
pub struct PublicListParams {
    pub page: u32,
    pub size: u32,
    pub search: Option<String>,
    pub file_type: Option<FileType>,
    pub time_filter: Option<TimeFilter>,
    pub sort_by: SortBy,
}

/// Query parameters of the per-user list endpoint.
#[derive(Debug, Clone)]
pub struct UserListParams {
    pub user_id: i64,
    pub page: u32,
    pub size: u32,
    pub folder_id: Option<i64>,
}

#[derive(Clone)]
pub struct DocumentListCache {
    service: CacheService,
}

impl DocumentListCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            service: CacheService::new(kv),
        }
    }

    pub async fn public_list<F, Fut>(
        &self,
        params: &PublicListParams,
        query: F,
    ) -> Result<CachedResult<DocumentListPage>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DocumentListPage, QueryError>>,
    {
        let key = CacheKey::PublicList {
            page: params.page,
            size: params.size,
            search: params.search.clone(),
            file_type: params.file_type,
            time_filter: params.time_filter,
            sort_by: params.sort_by,
        };
        let mut extras = Map::new();
        extras.insert("page".to_owned(), json!(params.page));
        extras.insert("size".to_owned(), json!(params.size));
        self.service
            .fetch(&key, key.family().default_ttl_secs(), extras, query)
            .await
    }

    pub async fn user_list<F, Fut>(
        &self,
        params: &UserListParams,
        query: F,
    ) -> Result<CachedResult<DocumentListPage>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DocumentListPage, QueryError>>,
    {
        let key = CacheKey::UserList {
            user_id: params.user_id,
            page: params.page,
            size: params.size,
            folder_id: params.folder_id,
        };
        let mut extras = Map::new();
        extras.insert("user_id".to_owned(), json!(params.user_id));
        extras.insert("page".to_owned(), json!(params.page));
        extras.insert("size".to_owned(), json!(params.size));
        if let Some(folder_id) = params.folder_id {
            extras.insert("folder_id".to_owned(), json!(folder_id));
        }
        self.service
            .fetch(&key, key.family().default_ttl_secs(), extras, query)
            .await
    }
}
