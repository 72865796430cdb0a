//! Stored-entry envelope and the annotation types attached to every cached
//! response.
//!
//! The envelope keeps the bookkeeping fields (`_cache_time`,
//! `_query_performance`) beside the domain payload instead of mixed into it,
//! so decoding a `StoredEntry<T>` never depends on `T` tolerating extra
//! fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Wall-clock format written into `_cache_time`. Seconds precision, no zone
/// suffix; the historical wire format for this field.
pub const WALL_CLOCK_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub(crate) fn wall_clock_string() -> String {
    OffsetDateTime::now_utc()
        .format(&WALL_CLOCK_FORMAT)
        .unwrap_or_default()
}

// ============================================================================
// Stored envelope
// ============================================================================

/// What actually lives under a cache key: the domain payload plus the
/// metadata recorded when the miss-path query ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    pub data: T,
    #[serde(rename = "_cache_time")]
    pub cache_time: String,
    #[serde(rename = "_query_performance")]
    pub query_performance: QueryPerformance,
}

/// Timing record for the query that produced a cached payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPerformance {
    /// Endpoint family name, e.g. `public_document_list`.
    pub query_type: String,
    /// Wall time of the query callback in milliseconds, rounded to 2 places.
    pub total_ms: f64,
    /// Family-specific context (page, size, keyword hash, ...).
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

// ============================================================================
// Response annotations
// ============================================================================

/// Cache provenance attached to every response from the read-through path.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub cached: bool,
    /// When the payload was stored. Hits report the stored stamp, misses
    /// the one just written; absent only on degraded paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_time: Option<String>,
    /// Remaining TTL in seconds. On a fresh store this is the issued TTL;
    /// `-2` when nothing is stored, `-1` when the store could not say.
    pub ttl_remaining: i64,
    /// Endpoint family name.
    pub cache_type: &'static str,
    pub cache_key: String,
    /// Degradation tag (`kv-unavailable`, `kv-write-failed`); absent on the
    /// healthy path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// What `fetch` hands back: the payload plus both annotation blocks.
#[derive(Debug, Clone)]
pub struct CachedResult<T> {
    pub data: T,
    pub cache_info: CacheInfo,
    pub query_performance: QueryPerformance,
}

impl<T: Serialize> CachedResult<T> {
    /// Render the endpoint-shaped JSON: domain fields at the top level with
    /// `cache_info` and `_query_performance` merged in. Non-object payloads
    /// (bare arrays, scalars) are nested under `data`.
    pub fn merged_json(&self) -> Value {
        let mut body = match serde_json::to_value(&self.data) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                let mut map = Map::new();
                map.insert("data".to_owned(), other);
                map
            }
            Err(_) => Map::new(),
        };
        body.insert("cache_info".to_owned(), json!(self.cache_info));
        body.insert(
            "_query_performance".to_owned(),
            json!(self.query_performance),
        );
        Value::Object(body)
    }
}
