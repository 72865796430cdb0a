//! Runtime settings for the cache layer.
//!
//! Settings are resolved in two steps: the `config` crate merges an optional
//! `config/default.toml` file with process environment overrides into a
//! [`RawSettings`] value, and [`Settings::from_raw`] validates that into the
//! typed form the rest of the crate consumes. Environment names match the
//! deployment contract of the wider DocPlaza backend (`REDIS_URL`,
//! `CACHE_KEY_PREFIX`, ...), so a cache process and the API it serves read
//! the same variables.

use config::{Config, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "docplaza";
pub const DEFAULT_USER_CACHE_TTL_SECS: u64 = 3600;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Raw (pre-validation) settings
// ============================================================================

/// Deserialization target for the merged config sources. Every field is
/// optional here; defaults and validation live in [`Settings::from_raw`].
#[derive(Debug, Default, Deserialize)]
pub struct RawSettings {
    pub redis_url: Option<String>,
    pub redis_password: Option<String>,
    pub redis_db: Option<i64>,
    pub redis_decode_responses: Option<bool>,
    pub cache_key_prefix: Option<String>,
    pub user_cache_ttl: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

// ============================================================================
// Resolved settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
    pub password: Option<String>,
    pub db: i64,
    pub decode_responses: bool,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Namespace for the user-profile cache keys. The endpoint-family caches
    /// keep their historical hard-coded prefixes and ignore this.
    pub key_prefix: String,
    pub user_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub redis: RedisSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Merge the optional config file with environment overrides and resolve.
    pub fn load() -> Result<Self, LoadError> {
        let mut builder =
            Config::builder().add_source(File::with_name("config/default").required(false));

        for (key, var) in [
            ("redis_url", "REDIS_URL"),
            ("redis_password", "REDIS_PASSWORD"),
            ("redis_db", "REDIS_DB"),
            ("redis_decode_responses", "REDIS_DECODE_RESPONSES"),
            ("cache_key_prefix", "CACHE_KEY_PREFIX"),
            ("user_cache_ttl", "USER_CACHE_TTL"),
            ("log_level", "LOG_LEVEL"),
            ("log_format", "LOG_FORMAT"),
        ] {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let url = raw
            .redis_url
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_owned());
        if url.trim().is_empty() {
            return Err(LoadError::invalid("redis_url", "must not be empty"));
        }

        let db = raw.redis_db.unwrap_or(0);
        if db < 0 {
            return Err(LoadError::invalid(
                "redis_db",
                format!("must be non-negative, got {db}"),
            ));
        }

        let key_prefix = raw
            .cache_key_prefix
            .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_owned());
        if key_prefix.is_empty() {
            return Err(LoadError::invalid("cache_key_prefix", "must not be empty"));
        }
        if !key_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(LoadError::invalid(
                "cache_key_prefix",
                format!("must be ASCII alphanumeric/underscore/hyphen, got {key_prefix:?}"),
            ));
        }

        let user_cache_ttl_secs = raw.user_cache_ttl.unwrap_or(DEFAULT_USER_CACHE_TTL_SECS);
        if user_cache_ttl_secs == 0 {
            return Err(LoadError::invalid("user_cache_ttl", "must be positive"));
        }

        let level = match raw.log_level.as_deref() {
            None => LevelFilter::INFO,
            Some(value) => value.parse().map_err(|_| {
                LoadError::invalid("log_level", format!("unrecognized level {value:?}"))
            })?,
        };

        let format = match raw.log_format.as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            Some(other) => {
                return Err(LoadError::invalid(
                    "log_format",
                    format!("expected `json` or `compact`, got {other:?}"),
                ));
            }
        };

        Ok(Self {
            redis: RedisSettings {
                url,
                password: raw.redis_password.filter(|p| !p.is_empty()),
                db,
                decode_responses: raw.redis_decode_responses.unwrap_or(true),
            },
            cache: CacheSettings {
                key_prefix,
                user_cache_ttl_secs,
            },
            logging: LoggingSettings { level, format },
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
