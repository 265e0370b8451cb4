use atelier_core::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A memoized value with its TTL bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub request_key: String,
    pub value: V,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at < ttl
    }
}

/// Time-bounded memoization keyed by provider code string.
///
/// Entries are only evicted by `clear_all`, `clear_expired` or `invalidate`;
/// nothing runs in the background. Computations run under the write lock so a
/// key is never computed twice within its TTL.
pub struct PriceCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> PriceCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key` if still within the TTL; otherwise the result of
    /// `compute`, which is stored on success. Errors are not cached.
    pub fn get_or_compute<E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = entries.get(key).filter(|e| e.is_fresh(now, self.ttl)) {
                return Ok(entry.value.clone());
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        // Another caller may have filled the key while we waited for the lock
        if let Some(entry) = entries.get(key).filter(|e| e.is_fresh(now, self.ttl)) {
            return Ok(entry.value.clone());
        }

        let value = compute()?;
        debug!(key, "price cache miss");
        entries.insert(
            key.to_string(),
            CacheEntry {
                request_key: key.to_string(),
                value: value.clone(),
                cached_at: now,
                expires_at: now + self.ttl,
            },
        );
        Ok(value)
    }

    /// Fresh entry for `key`, without computing
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).filter(|e| e.is_fresh(now, self.ttl)).cloned()
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    /// Drop every entry, returning how many were removed
    pub fn clear_all(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Drop entries whose TTL has elapsed, returning how many were removed
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let initial_count = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        initial_count - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
