//! In-process result caches with time-based expiry.
//!
//! Entries are keyed by content hash and become stale `ttl` after insertion.
//! There is no other invalidation: a warehouse-side data change is only
//! visible once the entry has aged out. Expired entries are swept on insert,
//! at most once per `ttl`, so keys that are never read again do not pile up.

mod hash;
pub use hash::{compute_hash, statement_key};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::warehouse::QueryResult;

/// Cache of query results keyed by [`statement_key`].
pub type QueryCache = TtlCache<QueryResult>;

struct Entry<V> {
    value: V,
    inserted: Instant,
}

/// A concurrent map whose entries expire a fixed time after insertion.
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    last_sweep: Mutex<Instant>,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Like [`get`](Self::get) against an explicit clock reading.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let fresh = self.entries.get(key).and_then(|entry| {
            if now.saturating_duration_since(entry.inserted) < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        });
        match fresh {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.entries
                    .remove_if(key, |_, e| now.saturating_duration_since(e.inserted) >= self.ttl);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let now = Instant::now();
        if self.sweep_due(now) {
            let purged = self.purge_expired_at(now);
            if purged > 0 {
                debug!(purged, "expired cache entries swept");
            }
        }
        self.entries.insert(key.into(), Entry { value, inserted: now });
    }

    fn sweep_due(&self, now: Instant) -> bool {
        match self.last_sweep.lock() {
            Ok(mut last) if now.saturating_duration_since(*last) >= self.ttl => {
                *last = now;
                true
            }
            _ => false,
        }
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted) < self.ttl);
        before - self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
