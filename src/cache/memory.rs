//! In-process [`KvStore`] backend.
//!
//! Used by the test suite and by single-node development setups that run
//! without Redis. Semantics mirror the Redis backend: lazy TTL expiry on
//! read, glob scan, the same degraded sentinels when availability is
//! switched off.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use glob::Pattern;
use tracing::warn;

use super::client::KvStore;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";

#[derive(Debug, Clone)]
struct Entry {
    raw: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle availability; `false` simulates a store outage.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    /// Force a key's TTL to elapse immediately. Lets TTL behavior be tested
    /// without sleeping.
    pub fn expire_now(&self, key: &str) {
        let mut entries = rw_write(&self.entries, SOURCE, "expire_now");
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now());
        }
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "len")
            .values()
            .filter(|entry| !entry.expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> bool {
        if self.unavailable.load(Ordering::Relaxed) {
            return false;
        }
        let expires_at = ttl_secs.map(|ttl| Instant::now() + Duration::from_secs(ttl));
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        entries.insert(
            key.to_owned(),
            Entry {
                raw: value.to_owned(),
                expires_at,
            },
        );
        true
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn available(&self) -> bool {
        !self.unavailable.load(Ordering::Relaxed)
    }

    async fn get(&self, key: &str) -> Option<String> {
        if self.unavailable.load(Ordering::Relaxed) {
            return None;
        }
        let now = Instant::now();
        {
            let entries = rw_read(&self.entries, SOURCE, "get");
            match entries.get(key) {
                Some(entry) if !entry.expired(now) => return Some(entry.raw.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it so exists/scan agree with get.
        let mut entries = rw_write(&self.entries, SOURCE, "get.expire");
        if entries.get(key).is_some_and(|entry| entry.expired(now)) {
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> bool {
        self.store(key, value, ttl_secs)
    }

    async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> bool {
        self.store(key, value, Some(ttl_secs))
    }

    async fn del(&self, key: &str) -> bool {
        if self.unavailable.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "del");
        match entries.remove(key) {
            Some(entry) => !entry.expired(now),
            None => false,
        }
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn ttl(&self, key: &str) -> i64 {
        if self.unavailable.load(Ordering::Relaxed) {
            return -1;
        }
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "ttl");
        match entries.get(key) {
            None => -2,
            Some(entry) if entry.expired(now) => -2,
            Some(Entry {
                expires_at: None, ..
            }) => -1,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at.duration_since(now);
                // Ceil so a freshly-written TTL reads back whole.
                remaining.as_secs() as i64 + i64::from(remaining.subsec_nanos() > 0)
            }
        }
    }

    async fn scan(&self, pattern: &str) -> Vec<String> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Vec::new();
        }
        let Ok(glob) = Pattern::new(pattern) else {
            warn!(pattern, "invalid scan pattern");
            return Vec::new();
        };
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "scan");
        entries
            .iter()
            .filter(|(key, entry)| !entry.expired(now) && glob.matches(key))
            .map(|(key, _)| key.clone())
            .collect()
    }
}
