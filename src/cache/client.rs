//! The key-value client seam and its Redis implementation.
//!
//! The cache layer never lets a store failure reach a caller as an error:
//! every [`KvStore`] method reports failure in-band (`None`, `false`, `-1`,
//! an empty vec) and logs the cause. [`RedisStore`] adds availability
//! tracking on top of the driver's connection manager so a dead Redis costs
//! each request one atomic load, not one timeout.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, IntoConnectionInfo, RedisResult};
use tracing::{debug, error, warn};

use crate::config::RedisSettings;

use super::lock::mutex_lock;
use super::metrics::{CacheOp, OpOutcome, elapsed_ms, record_op};

const SOURCE: &str = "cache::client";

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_RETRIES: usize = 3;
/// Minimum interval between PING probes while the store looks healthy.
const PROBE_INTERVAL: Duration = Duration::from_secs(1);
/// How long the store stays marked unavailable after a failed probe or a
/// failure streak, before the next probe is allowed.
const FAILURE_BACKOFF: Duration = Duration::from_secs(30);
const MAX_CONSECUTIVE_FAILURES: u32 = 3;
const SCAN_BATCH: usize = 100;

// ============================================================================
// Trait
// ============================================================================

/// Narrow async surface over the key-value store. Failures never surface as
/// errors; degraded backends answer with the documented sentinels.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Cheap availability check; memoized, safe to call per request.
    async fn available(&self) -> bool;

    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value`, optionally with a TTL. Returns whether the write stuck.
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> bool;

    async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> bool;

    /// Delete one key; `true` when a key was actually removed.
    async fn del(&self, key: &str) -> bool;

    async fn exists(&self, key: &str) -> bool;

    /// Remaining TTL in seconds. `-2` if the key is absent, `-1` if the key
    /// has no expiry or the store could not answer.
    async fn ttl(&self, key: &str) -> i64;

    /// All keys matching a glob pattern. Cursor-based; never blocks the
    /// store the way `KEYS` would.
    async fn scan(&self, pattern: &str) -> Vec<String>;
}

// ============================================================================
// Redis implementation
// ============================================================================

#[derive(Debug, Default)]
struct ProbeState {
    last_probe: Option<Instant>,
    retry_at: Option<Instant>,
}

pub struct RedisStore {
    conn: Option<ConnectionManager>,
    healthy: AtomicBool,
    consecutive_failures: AtomicU32,
    probe: Mutex<ProbeState>,
}

impl RedisStore {
    /// Connect to Redis. Never fails: a store that cannot be reached at
    /// startup comes up unavailable and every operation degrades in-band.
    pub async fn connect(settings: &RedisSettings) -> Self {
        let conn = match Self::dial(settings).await {
            Ok(conn) => {
                debug!(
                    url = %settings.url,
                    db = settings.db,
                    decode_responses = settings.decode_responses,
                    "connected to redis"
                );
                Some(conn)
            }
            Err(err) => {
                error!(
                    url = %settings.url,
                    error = %err,
                    "redis unreachable at startup; cache layer starts degraded"
                );
                None
            }
        };
        let healthy = conn.is_some();
        Self {
            conn,
            healthy: AtomicBool::new(healthy),
            consecutive_failures: AtomicU32::new(0),
            probe: Mutex::new(ProbeState::default()),
        }
    }

    async fn dial(settings: &RedisSettings) -> RedisResult<ConnectionManager> {
        let mut info = settings.url.as_str().into_connection_info()?;
        if let Some(password) = &settings.password {
            info.redis.password = Some(password.clone());
        }
        if settings.db != 0 {
            info.redis.db = settings.db;
        }
        let client = redis::Client::open(info)?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(DIAL_TIMEOUT)
            .set_response_timeout(RESPONSE_TIMEOUT)
            .set_number_of_retries(CONNECT_RETRIES);
        let mut conn = ConnectionManager::new_with_config(client, config).await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug_assert_eq!(pong, "PONG");
        Ok(conn)
    }

    fn connection(&self) -> Option<ConnectionManager> {
        self.conn.clone()
    }

    fn mark_op_ok(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.healthy.store(true, Ordering::Relaxed);
    }

    fn mark_op_failed(&self, op: &'static str, key: &str, err: &redis::RedisError) {
        warn!(op, key, error = %err, "redis operation failed");
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= MAX_CONSECUTIVE_FAILURES {
            self.healthy.store(false, Ordering::Relaxed);
            let mut probe = mutex_lock(&self.probe, SOURCE, op);
            probe.retry_at = Some(Instant::now() + FAILURE_BACKOFF);
            warn!(
                op,
                failures,
                backoff_secs = FAILURE_BACKOFF.as_secs(),
                "redis marked unavailable after failure streak"
            );
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn available(&self) -> bool {
        let Some(conn) = self.connection() else {
            return false;
        };

        // Decide under the lock whether this call owns the probe; the PING
        // itself runs outside it.
        {
            let now = Instant::now();
            let mut probe = mutex_lock(&self.probe, SOURCE, "available");
            if let Some(retry_at) = probe.retry_at {
                if now < retry_at {
                    return false;
                }
                probe.retry_at = None;
            }
            if let Some(last) = probe.last_probe {
                if now.duration_since(last) < PROBE_INTERVAL {
                    return self.healthy.load(Ordering::Relaxed);
                }
            }
            probe.last_probe = Some(now);
        }

        let mut conn = conn;
        let pong: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => {
                self.mark_op_ok();
                true
            }
            Err(err) => {
                warn!(error = %err, "redis ping failed");
                self.healthy.store(false, Ordering::Relaxed);
                let mut probe = mutex_lock(&self.probe, SOURCE, "available");
                probe.retry_at = Some(Instant::now() + FAILURE_BACKOFF);
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        if !self.available().await {
            record_op(CacheOp::Get, key, 0.0, None, OpOutcome::Unavailable);
            return None;
        }
        let mut conn = self.connection()?;
        let started = Instant::now();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => {
                self.mark_op_ok();
                let bytes = value.as_ref().map(String::len);
                record_op(CacheOp::Get, key, elapsed_ms(started), bytes, OpOutcome::Ok);
                value
            }
            Err(err) => {
                self.mark_op_failed("get", key, &err);
                record_op(CacheOp::Get, key, elapsed_ms(started), None, OpOutcome::Error);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> bool {
        match ttl_secs {
            Some(ttl) => self.setex(key, ttl, value).await,
            None => {
                if !self.available().await {
                    record_op(CacheOp::Set, key, 0.0, None, OpOutcome::Unavailable);
                    return false;
                }
                let Some(mut conn) = self.connection() else {
                    return false;
                };
                let started = Instant::now();
                match conn.set::<_, _, ()>(key, value).await {
                    Ok(()) => {
                        self.mark_op_ok();
                        record_op(
                            CacheOp::Set,
                            key,
                            elapsed_ms(started),
                            Some(value.len()),
                            OpOutcome::Ok,
                        );
                        true
                    }
                    Err(err) => {
                        self.mark_op_failed("set", key, &err);
                        record_op(CacheOp::Set, key, elapsed_ms(started), None, OpOutcome::Error);
                        false
                    }
                }
            }
        }
    }

    async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> bool {
        if !self.available().await {
            record_op(CacheOp::Set, key, 0.0, None, OpOutcome::Unavailable);
            return false;
        }
        let Some(mut conn) = self.connection() else {
            return false;
        };
        let started = Instant::now();
        match conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            Ok(()) => {
                self.mark_op_ok();
                record_op(
                    CacheOp::Set,
                    key,
                    elapsed_ms(started),
                    Some(value.len()),
                    OpOutcome::Ok,
                );
                true
            }
            Err(err) => {
                self.mark_op_failed("setex", key, &err);
                record_op(CacheOp::Set, key, elapsed_ms(started), None, OpOutcome::Error);
                false
            }
        }
    }

    async fn del(&self, key: &str) -> bool {
        if !self.available().await {
            return false;
        }
        let Some(mut conn) = self.connection() else {
            return false;
        };
        match conn.del::<_, i64>(key).await {
            Ok(removed) => {
                self.mark_op_ok();
                removed > 0
            }
            Err(err) => {
                self.mark_op_failed("del", key, &err);
                false
            }
        }
    }

    async fn exists(&self, key: &str) -> bool {
        if !self.available().await {
            return false;
        }
        let Some(mut conn) = self.connection() else {
            return false;
        };
        match conn.exists::<_, bool>(key).await {
            Ok(found) => {
                self.mark_op_ok();
                found
            }
            Err(err) => {
                self.mark_op_failed("exists", key, &err);
                false
            }
        }
    }

    async fn ttl(&self, key: &str) -> i64 {
        if !self.available().await {
            return -1;
        }
        let Some(mut conn) = self.connection() else {
            return -1;
        };
        match conn.ttl::<_, i64>(key).await {
            Ok(ttl) => {
                self.mark_op_ok();
                ttl
            }
            Err(err) => {
                self.mark_op_failed("ttl", key, &err);
                -1
            }
        }
    }

    async fn scan(&self, pattern: &str) -> Vec<String> {
        if !self.available().await {
            return Vec::new();
        }
        let Some(mut conn) = self.connection() else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let reply: RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;
            match reply {
                Ok((next, batch)) => {
                    keys.extend(batch);
                    if next == 0 {
                        self.mark_op_ok();
                        return keys;
                    }
                    cursor = next;
                }
                Err(err) => {
                    self.mark_op_failed("scan", pattern, &err);
                    return keys;
                }
            }
        }
    }
}
