//! Per-operation instrumentation and the per-response debug block.
//!
//! Counters and histograms are emitted through the `metrics` facade (the
//! recorder is the host application's choice); every emission is mirrored as
//! a `tracing` debug event so the behavior is observable without a recorder
//! installed.

use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::keys::CacheFamily;
use super::meta::{CacheInfo, wall_clock_string};

// ============================================================================
// Operation records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOp {
    Get,
    Set,
    Hit,
    Miss,
    Invalidate,
}

impl CacheOp {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Invalidate => "invalidate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpOutcome {
    Ok,
    Unavailable,
    Error,
}

impl OpOutcome {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Unavailable => "unavailable",
            Self::Error => "error",
        }
    }
}

pub(crate) fn record_op(
    op: CacheOp,
    key: &str,
    latency_ms: f64,
    payload_bytes: Option<usize>,
    outcome: OpOutcome,
) {
    counter!("plaza_cache_op_total", "op" => op.as_str(), "outcome" => outcome.as_str())
        .increment(1);
    histogram!("plaza_cache_op_ms", "op" => op.as_str()).record(latency_ms);
    if let Some(bytes) = payload_bytes {
        histogram!("plaza_cache_payload_bytes", "op" => op.as_str()).record(bytes as f64);
    }
    if outcome == OpOutcome::Unavailable {
        counter!("plaza_cache_kv_unavailable_total").increment(1);
    }
    debug!(
        op = op.as_str(),
        key,
        latency_ms,
        payload_bytes,
        outcome = outcome.as_str(),
        "cache operation"
    );
}

pub(crate) fn record_hit(family: CacheFamily) {
    counter!("plaza_cache_hit_total", "family" => family.as_str()).increment(1);
}

pub(crate) fn record_miss(family: CacheFamily) {
    counter!("plaza_cache_miss_total", "family" => family.as_str()).increment(1);
}

pub(crate) fn record_query_ms(family: CacheFamily, latency_ms: f64) {
    histogram!("plaza_cache_query_ms", "family" => family.as_str()).record(latency_ms);
}

pub(crate) fn record_invalidated(pattern: &str, deleted: u64) {
    counter!("plaza_cache_invalidated_total").increment(deleted);
    debug!(pattern, deleted, "cache invalidation");
}

pub(crate) fn record_fallback(reason: &str) {
    counter!("plaza_cache_fallback_total", "reason" => reason.to_owned()).increment(1);
}

pub(crate) fn elapsed_ms(started: Instant) -> f64 {
    round2(started.elapsed().as_secs_f64() * 1000.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Route debug block
// ============================================================================

/// Serialized into responses as `_route_debug_info`.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDebugInfo {
    pub route_total_time_ms: f64,
    pub cache_hit: bool,
    pub performance_improvement: &'static str,
    pub route_timestamp: String,
    pub query_params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Started at handler entry, finished once the cached result is in hand.
#[derive(Debug)]
pub struct RouteTimer {
    started: Instant,
}

impl RouteTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn finish(self, cache_info: &CacheInfo, query_params: Value) -> RouteDebugInfo {
        let performance_improvement = if cache_info.cached {
            "cache hit, database query skipped"
        } else {
            "cache miss, result stored for the next request"
        };
        RouteDebugInfo {
            route_total_time_ms: elapsed_ms(self.started),
            cache_hit: cache_info.cached,
            performance_improvement,
            route_timestamp: wall_clock_string(),
            query_params,
            warning: cache_info
                .reason
                .map(|reason| format!("cache degraded: {reason}")),
        }
    }
}
