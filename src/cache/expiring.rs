//! String-keyed store with a per-entry time-to-live.
//!
//! # Responsibilities
//! - Hold values together with their expiry instant
//! - Keep expired values readable as `Stale` until they are evicted
//! - Bound the number of entries

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Present and not yet expired.
    Fresh(V),
    /// Present but past its TTL.
    Stale(V),
    /// Never stored, or evicted.
    Missing,
}

impl<V> Lookup<V> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }

    /// The stored value regardless of freshness.
    pub fn into_value(self) -> Option<V> {
        match self {
            Lookup::Fresh(v) | Lookup::Stale(v) => Some(v),
            Lookup::Missing => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A thread-safe expiring cache, cheap to clone.
#[derive(Debug, Clone)]
pub struct ExpiringCache<V> {
    inner: Arc<DashMap<String, Entry<V>>>,
    capacity: usize,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Lookup<V> {
        match self.inner.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Lookup::Fresh(entry.value.clone()),
            Some(entry) => Lookup::Stale(entry.value.clone()),
            None => Lookup::Missing,
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        if !self.inner.contains_key(&key) && self.inner.len() >= self.capacity {
            self.make_room();
        }
        self.inner.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn make_room(&self) {
        if self.purge_expired() > 0 && self.inner.len() < self.capacity {
            return;
        }

        // Everything is still fresh: give up the entry closest to expiry.
        let victim = self
            .inner
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.inner.remove(&key);
        }
    }
}
