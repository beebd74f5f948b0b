//! In-memory LRU cache for lookup outcomes.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::config::serde_duration;
use crate::LookupResult;

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries; `0` disables the cache.
    pub max_size: usize,
    /// Expiry for found records; `None` keeps them until evicted.
    #[serde(default, with = "serde_duration::option_ms")]
    pub ttl: Option<Duration>,
    /// Expiry for confirmed not-found records; `None` keeps them until evicted.
    #[serde(default, with = "serde_duration::option_ms")]
    pub not_found_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1_000,
            ttl: None,
            not_found_ttl: Some(Duration::from_secs(3_600)),
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, `0.0` before the first lookup.
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: LookupResult,
    stored_at: Instant,
    ttl: Option<Duration>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.ttl
            .map(|ttl| now.duration_since(self.stored_at) >= ttl)
            .unwrap_or(false)
    }
}

#[derive(Debug)]
struct CacheInner {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Thread-safe, bounded cache of lookup outcomes keyed by normalized ISBN.
///
/// Both found records and confirmed not-found outcomes are stored; the
/// resolver never passes failed upstream calls here.
#[derive(Debug)]
pub struct LookupCache {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl LookupCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Create a disabled cache: every `get` misses and `put` is a no-op.
    pub fn disabled() -> Self {
        Self::new(CacheConfig {
            max_size: 0,
            ..CacheConfig::default()
        })
    }

    pub const fn is_enabled(&self) -> bool {
        self.config.max_size > 0
    }

    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the cached outcome for `isbn`, refreshing its recency.
    ///
    /// Expired entries are dropped and reported as misses.
    pub fn get(&self, isbn: &str) -> Option<LookupResult> {
        let mut inner = self.lock();
        if !self.is_enabled() {
            inner.misses += 1;
            return None;
        }

        let now = Instant::now();
        let lookup = inner
            .entries
            .get(isbn)
            .map(|entry| (entry.is_expired(now), entry.result.clone()));

        match lookup {
            Some((false, result)) => {
                inner.hits += 1;
                Some(result)
            }
            Some((true, _)) => {
                inner.entries.pop(isbn);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Stores `result`, evicting the least recently used entry when full.
    pub fn put(&self, isbn: impl Into<String>, result: LookupResult) {
        if !self.is_enabled() {
            return;
        }

        let ttl = if result.success() {
            self.config.ttl
        } else {
            self.config.not_found_ttl
        };
        let isbn = isbn.into();
        let mut inner = self.lock();
        if let Some((evicted, _)) = inner.entries.push(
            isbn.clone(),
            CacheEntry {
                result,
                stored_at: Instant::now(),
                ttl,
            },
        ) {
            if evicted != isbn {
                tracing::trace!(isbn = %evicted, "evicted least recently used cache entry");
            }
        }
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        let expired = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(isbn, _)| isbn.clone())
            .collect::<Vec<_>>();

        for isbn in &expired {
            inner.entries.pop(isbn);
        }
        expired.len()
    }

    /// Empties the cache and resets hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let lookups = inner.hits + inner.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            inner.hits as f64 / lookups as f64
        };

        CacheStats {
            size: inner.entries.len(),
            max_size: self.config.max_size,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
