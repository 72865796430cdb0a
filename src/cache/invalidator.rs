//! Event-driven invalidation for the endpoint-family caches.
//!
//! The write paths (publish, unpublish, feature toggle, document CRUD) call
//! in here after committing. Every operation is idempotent, reports how many
//! keys it removed, and swallows store trouble; a failed invalidation means
//! readers see stale data until the TTL clears it, never a failed write.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::client::KvStore;
use super::keys::patterns;
use super::metrics::{CacheOp, OpOutcome, elapsed_ms, record_invalidated, record_op};

/// A committed write the cache layer must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A document entered the public catalog.
    Published { author_id: i64 },
    /// A document left the public catalog.
    Unpublished { author_id: i64 },
    /// A published document's featured flag flipped.
    FeaturedChanged { author_id: i64 },
    /// A published document's title or body changed.
    ContentUpdated { author_id: i64 },
    /// A user's own documents or folders changed (create, move, delete).
    UserDocumentsChanged { user_id: i64 },
}

#[derive(Clone)]
pub struct Invalidator {
    kv: Arc<dyn KvStore>,
}

impl Invalidator {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Delete every key matching `pattern`; returns how many went away.
    async fn delete_matching(&self, pattern: &str) -> u64 {
        if !self.kv.available().await {
            record_op(CacheOp::Invalidate, pattern, 0.0, None, OpOutcome::Unavailable);
            record_invalidated(pattern, 0);
            return 0;
        }
        let started = Instant::now();
        let keys = self.kv.scan(pattern).await;
        let mut deleted = 0u64;
        for key in &keys {
            if self.kv.del(key).await {
                deleted += 1;
            }
        }
        record_op(
            CacheOp::Invalidate,
            pattern,
            elapsed_ms(started),
            None,
            OpOutcome::Ok,
        );
        record_invalidated(pattern, deleted);
        if deleted > 0 {
            info!(pattern, deleted, "invalidated cache keys");
        }
        deleted
    }

    pub async fn invalidate_public_list(&self) -> u64 {
        self.delete_matching(patterns::PUBLIC_LIST).await
    }

    pub async fn invalidate_user_list(&self, user_id: i64) -> u64 {
        self.delete_matching(&patterns::user_list(user_id)).await
    }

    pub async fn invalidate_tech_square_stats(&self) -> u64 {
        self.delete_single("stats:tech_square:global").await
    }

    pub async fn invalidate_user_stats(&self, user_id: i64) -> u64 {
        self.delete_single(&format!("stats:user_docs:{user_id}")).await
    }

    /// Delete one exact key; the single-key twin of `delete_matching`.
    async fn delete_single(&self, key: &str) -> u64 {
        let started = Instant::now();
        let deleted = u64::from(self.kv.del(key).await);
        record_op(
            CacheOp::Invalidate,
            key,
            elapsed_ms(started),
            None,
            OpOutcome::Ok,
        );
        record_invalidated(key, deleted);
        deleted
    }

    pub async fn invalidate_hot_documents(&self) -> u64 {
        self.delete_matching(patterns::HOT_DOCS).await
    }

    pub async fn invalidate_latest_documents(&self) -> u64 {
        self.delete_matching(patterns::LATEST_DOCS).await
    }

    pub async fn invalidate_all_hot_data(&self) -> u64 {
        self.delete_matching(patterns::ALL_HOT_DATA).await
    }

    pub async fn invalidate_search_all(&self) -> u64 {
        self.delete_matching(patterns::SEARCH_ALL).await
    }

    pub async fn invalidate_search_by_keyword(&self, keyword: &str) -> u64 {
        self.delete_matching(&patterns::search_keyword(keyword))
            .await
    }

    /// React to a committed write. Returns the total number of keys removed
    /// across all affected families.
    pub async fn on_document_event(&self, event: &DocumentEvent) -> u64 {
        match event {
            DocumentEvent::Published { author_id }
            | DocumentEvent::Unpublished { author_id }
            | DocumentEvent::FeaturedChanged { author_id } => {
                self.catalog_changed(*author_id).await
            }
            DocumentEvent::ContentUpdated { author_id } => {
                // Search results index titles and bodies, so content edits
                // reach further than the other catalog events.
                self.catalog_changed(*author_id).await + self.invalidate_search_all().await
            }
            DocumentEvent::UserDocumentsChanged { user_id } => {
                self.invalidate_user_list(*user_id).await
                    + self.invalidate_user_stats(*user_id).await
            }
        }
    }

    async fn catalog_changed(&self, author_id: i64) -> u64 {
        self.invalidate_public_list().await
            + self.invalidate_tech_square_stats().await
            + self.invalidate_all_hot_data().await
            + self.invalidate_user_stats(author_id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::memory::MemoryStore;

    use super::*;

    async fn seeded() -> (Arc<MemoryStore>, Invalidator) {
        let store = Arc::new(MemoryStore::new());
        for (key, value) in [
            ("doc_list:public:p1:s10:qnone:tnone:timenone:sortlatest", "a"),
            ("doc_list:public:p2:s10:qnone:tnone:timenone:sortlatest", "b"),
            ("doc_list:user42:p1:s20:fnone", "c"),
            ("hot_data:hot_docs:limit_10", "d"),
            ("hot_data:latest_docs:limit_5", "e"),
            ("search_cache:keyword_abcd1234:p1:s10:tnone", "f"),
            ("stats:tech_square:global", "g"),
            ("stats:user_docs:42", "h"),
        ] {
            store.setex(key, 600, value).await;
        }
        let invalidator = Invalidator::new(store.clone());
        (store, invalidator)
    }

    #[tokio::test]
    async fn public_list_invalidation_is_local() {
        let (store, invalidator) = seeded().await;
        assert_eq!(invalidator.invalidate_public_list().await, 2);
        // Other families untouched.
        assert!(store.exists("doc_list:user42:p1:s20:fnone").await);
        assert!(store.exists("hot_data:hot_docs:limit_10").await);
        assert!(store.exists("stats:tech_square:global").await);
    }

    #[tokio::test]
    async fn invalidation_is_idempotent() {
        let (_store, invalidator) = seeded().await;
        assert_eq!(invalidator.invalidate_all_hot_data().await, 2);
        assert_eq!(invalidator.invalidate_all_hot_data().await, 0);
    }

    #[tokio::test]
    async fn user_scoped_invalidation_spares_other_users() {
        let (store, invalidator) = seeded().await;
        store.setex("doc_list:user7:p1:s20:fnone", 600, "x").await;
        assert_eq!(invalidator.invalidate_user_list(42).await, 1);
        assert!(store.exists("doc_list:user7:p1:s20:fnone").await);
        assert_eq!(invalidator.invalidate_user_stats(42).await, 1);
    }

    #[tokio::test]
    async fn keyword_invalidation_matches_normalized_keyword() {
        let store = Arc::new(MemoryStore::new());
        let key = crate::cache::keys::CacheKey::Search {
            keyword: "Rust".to_owned(),
            page: 1,
            size: 10,
            file_type: None,
        }
        .render();
        store.setex(&key, 480, "r").await;
        let invalidator = Invalidator::new(store.clone());
        assert_eq!(invalidator.invalidate_search_by_keyword(" rust ").await, 1);
        assert_eq!(invalidator.invalidate_search_by_keyword("python").await, 0);
    }

    #[tokio::test]
    async fn publish_event_clears_catalog_families() {
        let (store, invalidator) = seeded().await;
        let deleted = invalidator
            .on_document_event(&DocumentEvent::Published { author_id: 42 })
            .await;
        // public list (2) + tech-square stats + hot data (2) + user stats.
        assert_eq!(deleted, 6);
        assert!(store.exists("search_cache:keyword_abcd1234:p1:s10:tnone").await);
        assert!(store.exists("doc_list:user42:p1:s20:fnone").await);
    }

    #[tokio::test]
    async fn content_update_also_clears_search() {
        let (store, invalidator) = seeded().await;
        let deleted = invalidator
            .on_document_event(&DocumentEvent::ContentUpdated { author_id: 42 })
            .await;
        assert_eq!(deleted, 7);
        assert!(!store.exists("search_cache:keyword_abcd1234:p1:s10:tnone").await);
    }

    #[tokio::test]
    async fn user_documents_event_is_user_scoped() {
        let (store, invalidator) = seeded().await;
        let deleted = invalidator
            .on_document_event(&DocumentEvent::UserDocumentsChanged { user_id: 42 })
            .await;
        assert_eq!(deleted, 2);
        assert!(store.exists("doc_list:public:p1:s10:qnone:tnone:timenone:sortlatest").await);
    }

    #[tokio::test]
    async fn unavailable_store_deletes_nothing() {
        let (store, invalidator) = seeded().await;
        store.set_available(false);
        assert_eq!(invalidator.invalidate_public_list().await, 0);
        assert_eq!(invalidator.invalidate_tech_square_stats().await, 0);
        store.set_available(true);
        assert!(store.exists("stats:tech_square:global").await);
    }
}
