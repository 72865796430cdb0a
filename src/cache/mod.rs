//! Read-through caching for the DocPlaza read-side endpoints.
//!
//! The module splits along the request path: [`client`] and [`memory`] hold
//! the key-value backends, [`keys`] renders the typed cache keys, [`service`]
//! runs the read-through protocol that the per-family wrappers ([`doc_list`],
//! [`hot_data`], [`search`], [`stats`], [`user_cache`]) build on,
//! [`fallback`] shields handlers from cache-path panics, [`invalidator`]
//! reacts to write events, and [`metrics`] carries the instrumentation.

pub mod client;
pub mod doc_list;
pub mod error;
pub mod fallback;
pub mod hot_data;
pub mod invalidator;
pub mod keys;
mod lock;
pub mod memory;
pub mod meta;
pub mod metrics;
pub mod search;
pub mod service;
pub mod stats;
pub mod user_cache;

pub use client::{KvStore, RedisStore};
pub use doc_list::{DocumentListCache, PublicListParams, UserListParams};
pub use error::{CacheError, QueryError};
pub use fallback::{FallbackInfo, FallbackOutcome, fetch_or_direct};
pub use hot_data::HotDataCache;
pub use invalidator::{DocumentEvent, Invalidator};
pub use keys::{CacheFamily, CacheKey, SortBy, TimeFilter, fingerprint};
pub use memory::MemoryStore;
pub use meta::{CacheInfo, CachedResult, QueryPerformance, StoredEntry};
pub use metrics::{RouteDebugInfo, RouteTimer};
pub use search::{SearchCache, SearchParams};
pub use service::CacheService;
pub use stats::StatsCache;
pub use user_cache::UserCache;
