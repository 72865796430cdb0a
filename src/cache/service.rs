//! The read-through protocol every endpoint-family cache builds on.
//!
//! `fetch` is the whole contract: try the store, fall back to the caller's
//! query on a miss, write the result back with the family TTL, and annotate
//! whatever happened. Cache trouble degrades the annotations, never the
//! response; only the query callback's own error propagates.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use super::client::KvStore;
use super::error::{CacheError, QueryError};
use super::keys::{CacheFamily, CacheKey};
use super::meta::{CacheInfo, CachedResult, QueryPerformance, StoredEntry, wall_clock_string};
use super::metrics::{
    CacheOp, OpOutcome, elapsed_ms, record_hit, record_miss, record_op, record_query_ms, round2,
};

pub(crate) const REASON_KV_UNAVAILABLE: &str = "kv-unavailable";
pub(crate) const REASON_WRITE_FAILED: &str = "kv-write-failed";

#[derive(Clone)]
pub struct CacheService {
    kv: Arc<dyn KvStore>,
}

impl CacheService {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Read-through fetch. `extras` is family context recorded into
    /// `_query_performance` on the miss path (page, keyword hash, ...).
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl_secs: u64,
        extras: Map<String, Value>,
        query: F,
    ) -> Result<CachedResult<T>, QueryError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let family = key.family();
        let rendered = key.render();

        if !self.kv.available().await {
            record_op(CacheOp::Get, &rendered, 0.0, None, OpOutcome::Unavailable);
            let (data, query_performance) = Self::run_query(family, extras, query).await?;
            return Ok(CachedResult {
                data,
                cache_info: CacheInfo {
                    cached: false,
                    cache_time: None,
                    ttl_remaining: -2,
                    cache_type: family.as_str(),
                    cache_key: rendered,
                    reason: Some(REASON_KV_UNAVAILABLE),
                },
                query_performance,
            });
        }

        if let Some(raw) = self.kv.get(&rendered).await {
            match serde_json::from_str::<StoredEntry<T>>(&raw) {
                Ok(entry) => {
                    record_hit(family);
                    record_op(CacheOp::Hit, &rendered, 0.0, Some(raw.len()), OpOutcome::Ok);
                    let ttl_remaining = self.kv.ttl(&rendered).await;
                    return Ok(CachedResult {
                        data: entry.data,
                        cache_info: CacheInfo {
                            cached: true,
                            cache_time: Some(entry.cache_time),
                            ttl_remaining,
                            cache_type: family.as_str(),
                            cache_key: rendered,
                            reason: None,
                        },
                        query_performance: entry.query_performance,
                    });
                }
                Err(err) => {
                    // Stale or foreign payload under our key; treat as a miss
                    // and let the fresh write replace it.
                    let decode = CacheError::Decode(err.to_string());
                    warn!(
                        key = %rendered,
                        error = %decode,
                        reason = decode.reason(),
                        "cached payload unreadable, refreshing"
                    );
                }
            }
        }

        record_miss(family);
        record_op(CacheOp::Miss, &rendered, 0.0, None, OpOutcome::Ok);
        let (data, query_performance) = Self::run_query(family, extras, query).await?;

        let entry = StoredEntry {
            data,
            cache_time: wall_clock_string(),
            query_performance,
        };
        let stored = match serde_json::to_string(&entry) {
            Ok(raw) => self.kv.setex(&rendered, ttl_secs, &raw).await,
            Err(err) => {
                warn!(key = %rendered, error = %err, "cache payload failed to serialize");
                false
            }
        };

        // A successful write reports the stored `_cache_time`; degraded
        // branches leave it absent since nothing is cached.
        let (cache_time, ttl_remaining, reason) = if stored {
            (Some(entry.cache_time.clone()), ttl_secs as i64, None)
        } else {
            (None, -2, Some(REASON_WRITE_FAILED))
        };

        Ok(CachedResult {
            data: entry.data,
            cache_info: CacheInfo {
                cached: false,
                cache_time,
                ttl_remaining,
                cache_type: family.as_str(),
                cache_key: rendered,
                reason,
            },
            query_performance: entry.query_performance,
        })
    }

    async fn run_query<T, F, Fut>(
        family: CacheFamily,
        extras: Map<String, Value>,
        query: F,
    ) -> Result<(T, QueryPerformance), QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let started = Instant::now();
        let data = query().await?;
        let total_ms = elapsed_ms(started);
        record_query_ms(family, total_ms);
        Ok((
            data,
            QueryPerformance {
                query_type: family.as_str().to_owned(),
                total_ms: round2(total_ms),
                extras,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use crate::cache::memory::MemoryStore;

    use super::*;

    fn service() -> (Arc<MemoryStore>, CacheService) {
        let store = Arc::new(MemoryStore::new());
        let service = CacheService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn miss_then_hit_serves_stored_payload() {
        let (store, service) = service();
        let key = CacheKey::TechSquareStats;

        let first = service
            .fetch(&key, 900, Map::new(), || async { Ok(json!({"total": 5})) })
            .await
            .unwrap();
        assert!(!first.cache_info.cached);
        assert_eq!(first.cache_info.ttl_remaining, 900);
        assert!(first.cache_info.reason.is_none());
        // The miss reports the `_cache_time` it just wrote.
        let raw = store.get(&key.render()).await.unwrap();
        let entry: StoredEntry<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            first.cache_info.cache_time.as_deref(),
            Some(entry.cache_time.as_str())
        );

        async fn must_not_run() -> Result<Value, QueryError> {
            panic!("query must not run on a hit")
        }
        let second = service
            .fetch(&key, 900, Map::new(), must_not_run)
            .await
            .unwrap();
        assert!(second.cache_info.cached);
        assert_eq!(second.data, json!({"total": 5}));
        assert!(second.cache_info.cache_time.is_some());
        assert!(second.cache_info.ttl_remaining > 0);
        assert!(second.cache_info.ttl_remaining <= 900);
        assert_eq!(
            second.query_performance.query_type,
            first.query_performance.query_type
        );
    }

    #[tokio::test]
    async fn unavailable_store_skips_cache_with_reason() {
        let (store, service) = service();
        store.set_available(false);
        let result = service
            .fetch(&CacheKey::TechSquareStats, 900, Map::new(), || async {
                Ok(json!({"total": 1}))
            })
            .await
            .unwrap();
        assert!(!result.cache_info.cached);
        assert_eq!(result.cache_info.reason, Some(REASON_KV_UNAVAILABLE));
        assert_eq!(result.cache_info.ttl_remaining, -2);
        assert!(result.cache_info.cache_time.is_none());
        assert_eq!(result.data, json!({"total": 1}));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn query_error_propagates() {
        let (_store, service) = service();
        let err = service
            .fetch::<Value, _, _>(&CacheKey::TechSquareStats, 900, Map::new(), || async {
                Err(QueryError::msg("db down"))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("db down"));
    }

    #[tokio::test]
    async fn undecodable_entry_is_refreshed() {
        let (store, service) = service();
        let key = CacheKey::TechSquareStats;
        store.setex(&key.render(), 900, "not json").await;

        let result = service
            .fetch(&key, 900, Map::new(), || async { Ok(json!({"total": 2})) })
            .await
            .unwrap();
        assert!(!result.cache_info.cached);
        let raw = store.get(&key.render()).await.unwrap();
        let entry: StoredEntry<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.data, json!({"total": 2}));
    }

    // Store that accepts reads but refuses writes; exercises the
    // write-failed degradation.
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl KvStore for ReadOnlyStore {
        async fn available(&self) -> bool {
            true
        }
        async fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).await
        }
        async fn set(&self, _key: &str, _value: &str, _ttl_secs: Option<u64>) -> bool {
            false
        }
        async fn setex(&self, _key: &str, _ttl_secs: u64, _value: &str) -> bool {
            false
        }
        async fn del(&self, key: &str) -> bool {
            self.0.del(key).await
        }
        async fn exists(&self, key: &str) -> bool {
            self.0.exists(key).await
        }
        async fn ttl(&self, key: &str) -> i64 {
            self.0.ttl(key).await
        }
        async fn scan(&self, pattern: &str) -> Vec<String> {
            self.0.scan(pattern).await
        }
    }

    #[tokio::test]
    async fn failed_write_still_serves_fresh_data() {
        let service = CacheService::new(Arc::new(ReadOnlyStore(MemoryStore::new())));
        let result = service
            .fetch(&CacheKey::TechSquareStats, 900, Map::new(), || async {
                Ok(json!({"total": 9}))
            })
            .await
            .unwrap();
        assert!(!result.cache_info.cached);
        assert_eq!(result.cache_info.reason, Some(REASON_WRITE_FAILED));
        assert_eq!(result.cache_info.ttl_remaining, -2);
        assert!(result.cache_info.cache_time.is_none());
        assert_eq!(result.data, json!({"total": 9}));
    }

    #[tokio::test]
    async fn extras_are_recorded_on_miss() {
        let (_store, service) = service();
        let mut extras = Map::new();
        extras.insert("page".to_owned(), json!(3));
        let result = service
            .fetch(
                &CacheKey::HotDocuments { limit: 10 },
                600,
                extras,
                || async { Ok(json!([])) },
            )
            .await
            .unwrap();
        assert_eq!(result.query_performance.extras["page"], 3);
        assert_eq!(result.query_performance.query_type, "hot_documents");
    }
}
