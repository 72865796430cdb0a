//! Error taxonomy for the cache layer.
//!
//! [`CacheError`] classifies internal cache-path failures; it never crosses
//! the service boundary as an error, only as a degraded-response `reason`
//! string. [`QueryError`] wraps whatever the miss-path query callback failed
//! with and is the one error [`crate::cache::CacheService::fetch`] propagates.

use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key-value store is unavailable")]
    Unavailable,

    #[error("key-value transport error: {0}")]
    Transport(String),

    #[error("cached payload failed to decode: {0}")]
    Decode(String),
}

impl CacheError {
    /// Stable machine-readable tag, used as the `reason` field of degraded
    /// responses and as a metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unavailable => "kv-unavailable",
            Self::Transport(_) => "kv-transport-error",
            Self::Decode(_) => "decode-error",
        }
    }
}

/// An error from the caller-supplied query callback. Opaque to the cache
/// layer; carried through `fetch` untouched.
#[derive(Debug, Error)]
#[error("query failed: {source}")]
pub struct QueryError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl QueryError {
    pub fn new(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            source: message.into().into(),
        }
    }
}
