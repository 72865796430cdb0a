use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and register metric descriptions.
/// Call once at process start; a second call reports the collision as an
/// [`InfraError`].
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    // RUST_LOG still wins over the configured default level.
    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("tracing subscriber rejected: {err}")))
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "plaza_cache_hit_total",
            Unit::Count,
            "Total number of cache hits, labeled by endpoint family."
        );
        describe_counter!(
            "plaza_cache_miss_total",
            Unit::Count,
            "Total number of cache misses, labeled by endpoint family."
        );
        describe_counter!(
            "plaza_cache_op_total",
            Unit::Count,
            "Total number of key-value operations, labeled by op and outcome."
        );
        describe_counter!(
            "plaza_cache_invalidated_total",
            Unit::Count,
            "Total number of cache keys deleted by invalidation passes."
        );
        describe_counter!(
            "plaza_cache_fallback_total",
            Unit::Count,
            "Total number of requests served by the direct-query fallback."
        );
        describe_counter!(
            "plaza_cache_kv_unavailable_total",
            Unit::Count,
            "Total number of cache reads skipped because the store was down."
        );
        describe_histogram!(
            "plaza_cache_op_ms",
            Unit::Milliseconds,
            "Key-value operation latency in milliseconds."
        );
        describe_histogram!(
            "plaza_cache_query_ms",
            Unit::Milliseconds,
            "Miss-path query latency in milliseconds."
        );
        describe_histogram!(
            "plaza_cache_payload_bytes",
            Unit::Bytes,
            "Serialized cache payload size in bytes."
        );
    });
}
