//! End-to-end behavior of the read-through path against the in-process
//! store: key placement, hit/miss equivalence, TTLs, degradation, and the
//! response annotations handlers forward to clients.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::json;
use time::macros::datetime;
use tokio::sync::Barrier;

use plaza_cache::cache::{
    CacheKey, DocumentListCache, HotDataCache, KvStore, MemoryStore, PublicListParams, QueryError,
    RouteTimer, SearchCache, SearchParams, SortBy, StatsCache, StoredEntry, fingerprint,
};
use plaza_cache::domain::{
    DocumentListPage, DocumentSummary, FileType, SearchResultsPage, TechSquareStats,
};

fn doc(id: i64, title: &str) -> DocumentSummary {
    DocumentSummary {
        id,
        title: title.to_owned(),
        author: "ada".to_owned(),
        file_type: FileType::Md,
        view_count: 10 * id,
        is_featured: false,
        published_at: datetime!(2026-08-01 12:00:00 UTC),
    }
}

fn page(ids: &[i64]) -> DocumentListPage {
    DocumentListPage {
        documents: ids.iter().map(|&id| doc(id, "intro")).collect(),
        total: ids.len() as u64,
        page: 1,
        size: 10,
    }
}

#[tokio::test]
async fn default_public_list_lands_under_the_documented_key() {
    let store = Arc::new(MemoryStore::new());
    let cache = DocumentListCache::new(store.clone());
    let params = PublicListParams {
        page: 1,
        size: 10,
        ..PublicListParams::default()
    };

    let result = cache
        .public_list(&params, || async { Ok(page(&[1, 2])) })
        .await
        .unwrap();

    let expected_key = "doc_list:public:p1:s10:qnone:tnone:timenone:sortlatest";
    assert_eq!(result.cache_info.cache_key, expected_key);
    assert_eq!(result.cache_info.cache_type, "public_document_list");
    assert!(store.exists(expected_key).await);
    assert_eq!(store.ttl(expected_key).await, 600);

    let raw = store.get(expected_key).await.unwrap();
    let entry: StoredEntry<DocumentListPage> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entry.data, page(&[1, 2]));
    assert_eq!(entry.query_performance.query_type, "public_document_list");
}

#[tokio::test]
async fn hit_serves_the_same_data_without_rerunning_the_query() {
    let store = Arc::new(MemoryStore::new());
    let cache = DocumentListCache::new(store);
    let params = PublicListParams {
        page: 1,
        size: 10,
        ..PublicListParams::default()
    };
    let calls = AtomicU32::new(0);

    let query = || {
        calls.fetch_add(1, Ordering::Relaxed);
        async { Ok(page(&[3])) }
    };

    let miss = cache.public_list(&params, query).await.unwrap();
    assert!(!miss.cache_info.cached);

    let hit = cache
        .public_list(&params, || {
            calls.fetch_add(1, Ordering::Relaxed);
            async { Ok(page(&[999])) }
        })
        .await
        .unwrap();
    assert!(hit.cache_info.cached);
    assert_eq!(hit.data, miss.data);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert!(hit.cache_info.cache_time.is_some());
    assert!(hit.cache_info.ttl_remaining > 0 && hit.cache_info.ttl_remaining <= 600);
}

#[tokio::test]
async fn keyword_variants_share_one_search_entry() {
    let store = Arc::new(MemoryStore::new());
    let cache = SearchCache::new(store.clone());

    let results = SearchResultsPage {
        documents: vec![doc(5, "rust async")],
        total: 1,
        page: 1,
        size: 10,
        keyword: "Rust".to_owned(),
    };
    let seeded = results.clone();
    let first = cache
        .search(
            &SearchParams {
                keyword: "Rust".to_owned(),
                page: 1,
                size: 10,
                file_type: None,
            },
            || async { Ok(seeded) },
        )
        .await
        .unwrap();
    assert!(!first.cache_info.cached);
    assert_eq!(
        first.cache_info.cache_key,
        format!("search_cache:keyword_{}:p1:s10:tnone", fingerprint("rust"))
    );

    async fn must_not_run() -> Result<SearchResultsPage, QueryError> {
        panic!("normalized keyword should hit")
    }
    let second = cache
        .search(
            &SearchParams {
                keyword: "  rUsT ".to_owned(),
                page: 1,
                size: 10,
                file_type: None,
            },
            must_not_run,
        )
        .await
        .unwrap();
    assert!(second.cache_info.cached);
    assert_eq!(second.data, results);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn filter_variants_do_not_collide() {
    let store = Arc::new(MemoryStore::new());
    let cache = DocumentListCache::new(store.clone());

    let md_only = PublicListParams {
        page: 1,
        size: 10,
        file_type: Some(FileType::Md),
        ..PublicListParams::default()
    };
    let pdf_only = PublicListParams {
        page: 1,
        size: 10,
        file_type: Some(FileType::Pdf),
        ..PublicListParams::default()
    };

    cache
        .public_list(&md_only, || async { Ok(page(&[1])) })
        .await
        .unwrap();
    let pdf = cache
        .public_list(&pdf_only, || async { Ok(page(&[2])) })
        .await
        .unwrap();
    assert!(!pdf.cache_info.cached);
    assert_eq!(store.len(), 2);

    let md_again = cache
        .public_list(&md_only, || async { Ok(page(&[777])) })
        .await
        .unwrap();
    assert_eq!(md_again.data, page(&[1]));
}

#[tokio::test]
async fn expired_entry_misses_and_is_rewritten() {
    let store = Arc::new(MemoryStore::new());
    let cache = HotDataCache::new(store.clone());
    let key = CacheKey::HotDocuments { limit: 10 }.render();

    cache
        .hot_documents(10, || async {
            Ok(plaza_cache::domain::HotDocumentsPage {
                documents: vec![doc(1, "old")],
            })
        })
        .await
        .unwrap();
    store.expire_now(&key);

    let refreshed = cache
        .hot_documents(10, || async {
            Ok(plaza_cache::domain::HotDocumentsPage {
                documents: vec![doc(2, "new")],
            })
        })
        .await
        .unwrap();
    assert!(!refreshed.cache_info.cached);
    assert_eq!(refreshed.data.documents[0].id, 2);
    assert_eq!(store.ttl(&key).await, 600);
}

#[tokio::test]
async fn outage_serves_fresh_data_and_flags_the_response() {
    let store = Arc::new(MemoryStore::new());
    let cache = StatsCache::new(store.clone());
    store.set_available(false);

    let timer = RouteTimer::start();
    let result = cache
        .tech_square_stats(|| async {
            Ok(TechSquareStats {
                total_documents: 12,
                ..TechSquareStats::default()
            })
        })
        .await
        .unwrap();

    assert!(!result.cache_info.cached);
    assert_eq!(result.cache_info.reason, Some("kv-unavailable"));
    assert_eq!(result.data.total_documents, 12);

    let debug = timer.finish(&result.cache_info, json!({}));
    assert_eq!(
        debug.warning.as_deref(),
        Some("cache degraded: kv-unavailable")
    );

    // Recovery: the same call starts caching again.
    store.set_available(true);
    let after = cache
        .tech_square_stats(|| async {
            Ok(TechSquareStats {
                total_documents: 12,
                ..TechSquareStats::default()
            })
        })
        .await
        .unwrap();
    assert!(after.cache_info.reason.is_none());
    assert!(store.exists("stats:tech_square:global").await);
}

#[tokio::test]
async fn concurrent_misses_leave_one_coherent_entry() {
    let store = Arc::new(MemoryStore::new());
    let cache = StatsCache::new(store.clone());

    // Park both queries at a barrier so the misses overlap: each request
    // has already missed before either write-back runs.
    let barrier = Arc::new(Barrier::new(2));
    let gate_a = barrier.clone();
    let gate_b = barrier.clone();

    let a = cache.tech_square_stats(move || async move {
        gate_a.wait().await;
        Ok(TechSquareStats {
            total_documents: 1,
            ..TechSquareStats::default()
        })
    });
    let b = cache.tech_square_stats(move || async move {
        gate_b.wait().await;
        Ok(TechSquareStats {
            total_documents: 2,
            ..TechSquareStats::default()
        })
    });
    let (a, b) = tokio::join!(a, b);
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(!a.cache_info.cached);
    assert!(!b.cache_info.cached);
    assert_eq!(a.data.total_documents, 1);
    assert_eq!(b.data.total_documents, 2);

    // Last writer wins; either way the stored entry decodes and matches one
    // of the two query results.
    let raw = store.get("stats:tech_square:global").await.unwrap();
    let entry: StoredEntry<TechSquareStats> = serde_json::from_str(&raw).unwrap();
    assert!(entry.data.total_documents == 1 || entry.data.total_documents == 2);
}

#[tokio::test]
async fn merged_json_matches_the_response_contract() {
    let store = Arc::new(MemoryStore::new());
    let cache = DocumentListCache::new(store);
    let params = PublicListParams {
        page: 2,
        size: 10,
        sort_by: SortBy::Popular,
        ..PublicListParams::default()
    };

    let result = cache
        .public_list(&params, || async { Ok(page(&[4])) })
        .await
        .unwrap();
    let merged = result.merged_json();
    assert_eq!(merged["total"], 1);
    assert!(merged["documents"].is_array());
    assert_eq!(merged["cache_info"]["cached"], false);
    assert_eq!(merged["cache_info"]["ttl_remaining"], 600);
    // Even a miss carries the freshly written timestamp.
    assert!(merged["cache_info"]["cache_time"].is_string());
    assert_eq!(merged["_query_performance"]["page"], 2);
}
