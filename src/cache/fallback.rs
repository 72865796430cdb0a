//! Last line of defense for the read path: if the cache machinery itself
//! panics, serve the request from the direct query and note the downgrade.
//!
//! Query errors are not fallback material; they propagate either way, since
//! retrying a failing database from the fallback arm would only double the
//! load.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use tracing::error;

use super::error::QueryError;
use super::meta::{CachedResult, wall_clock_string};
use super::metrics::record_fallback;

/// Serialized into responses that were served by the fallback arm.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackInfo {
    pub used_fallback: bool,
    pub reason: String,
    pub timestamp: String,
}

#[derive(Debug)]
pub enum FallbackOutcome<T> {
    /// The cache path completed normally (hit or miss).
    Cached(CachedResult<T>),
    /// The cache path panicked; `data` came from the direct query.
    Direct { data: T, fallback: FallbackInfo },
}

impl<T> FallbackOutcome<T> {
    pub fn data(&self) -> &T {
        match self {
            Self::Cached(result) => &result.data,
            Self::Direct { data, .. } => data,
        }
    }

    pub fn cache_hit(&self) -> bool {
        match self {
            Self::Cached(result) => result.cache_info.cached,
            Self::Direct { .. } => false,
        }
    }
}

/// Run the cache path; on a panic, run the direct query instead.
pub async fn fetch_or_direct<T, C, F, Fut>(
    cache_path: C,
    direct: F,
) -> Result<FallbackOutcome<T>, QueryError>
where
    C: Future<Output = Result<CachedResult<T>, QueryError>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, QueryError>>,
{
    match AssertUnwindSafe(cache_path).catch_unwind().await {
        Ok(result) => Ok(FallbackOutcome::Cached(result?)),
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(reason = %reason, "cache path panicked, serving direct query");
            record_fallback(&reason);
            let data = direct().await?;
            Ok(FallbackOutcome::Direct {
                data,
                fallback: FallbackInfo {
                    used_fallback: true,
                    reason,
                    timestamp: wall_clock_string(),
                },
            })
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
