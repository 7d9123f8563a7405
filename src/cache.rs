//! A bounded, TTL-expiring map from token fingerprint to `(user,
//! adjusted_exp)`, backed by `dashmap::DashMap` (already a `brrtrouter`
//! dependency, used there for lock-free metrics) for the lock-free
//! `get`/`put` path, with a single update lock serializing
//! `put`/`removeIf`/`invalidateAll`.

use crate::user::User;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// `(user, adjusted_exp)`: `adjusted_exp = jwt_exp + allowed_clock_skew`. The
/// record is immutable once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiringUser {
    pub user: User,
    pub adjusted_exp: i64,
}

struct Entry {
    value: ExpiringUser,
    last_access: AtomicI64,
}

/// Cache usage statistics, going beyond the bare `{"size": n}` a minimal
/// report would give, in the spirit of the richer stats
/// `brrtrouter::security::JwksBearerProvider::cache_stats` already exposes
/// for its claims cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// `-1` when the cache is disabled.
    pub size: i64,
    pub capacity: usize,
}

/// Configuration for the cache. The cache is enabled iff both `ttl` and
/// `max_size` are positive.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_size: usize,
}

impl CacheConfig {
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.ttl_secs > 0 && self.max_size > 0
    }
}

/// The fingerprint-keyed cache. Construct via [`TokenCache::new`]; when the
/// config disables caching, every operation is a cheap no-op and `count()`
/// reports `-1`.
pub struct TokenCache {
    config: CacheConfig,
    entries: DashMap<[u8; 32], Entry>,
    update_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TokenCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            update_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.enabled()
    }

    /// Lock-free lookup. An entry whose `adjusted_exp` has passed is treated
    /// as absent (best-effort removal).
    #[must_use]
    pub fn get(&self, key: &[u8; 32]) -> Option<ExpiringUser> {
        if !self.enabled() {
            return None;
        }
        let now = now_unix();
        let hit = self.entries.get(key).and_then(|entry| {
            if entry.value.adjusted_exp < now {
                None
            } else {
                entry.last_access.store(now, Ordering::Relaxed);
                Some(entry.value.clone())
            }
        });
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.entries.remove(key);
        }
        hit
    }

    /// Insert under the update lock. Evicts the least-recently-accessed entry
    /// first if the cache is at capacity (weighted LRU, each entry weighing 1).
    pub fn put(&self, key: [u8; 32], value: ExpiringUser) {
        if !self.enabled() {
            return;
        }
        let _guard = self.update_lock.lock().unwrap_or_else(|p| p.into_inner());
        if self.entries.len() >= self.config.max_size && !self.entries.contains_key(&key) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|e| e.last_access.load(Ordering::Relaxed))
                .map(|e| *e.key())
            {
                self.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.entries.insert(
            key,
            Entry {
                value,
                last_access: AtomicI64::new(now_unix()),
            },
        );
    }

    /// Remove every entry whose user's principal satisfies `predicate`, under
    /// the update lock for the duration of the scan.
    pub fn remove_if(&self, predicate: impl Fn(&str) -> bool) {
        if !self.enabled() {
            return;
        }
        let _guard = self.update_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.entries.retain(|_, entry| !predicate(&entry.value.user.principal));
    }

    /// Clear the entire cache under the update lock.
    pub fn invalidate_all(&self) {
        if !self.enabled() {
            return;
        }
        let _guard = self.update_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.entries.clear();
    }

    /// Approximate size; `-1` when the cache is disabled.
    #[must_use]
    pub fn count(&self) -> i64 {
        if !self.enabled() {
            return -1;
        }
        self.entries.len() as i64
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.count(),
            capacity: self.config.max_size,
        }
    }
}
