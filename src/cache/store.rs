//! TTL cache with per-key single-flight.
//!
//! Strategy: cache computed payloads per key, stamped with the time they were
//! stored. A hit younger than the TTL is returned as a clone; an older entry
//! is evicted and recomputed.
//!
//! Cache structure:
//! - `DashMap<String, Arc<Mutex<Option<CacheEntry<V>>>>>`: one slot per key
//! - The slot mutex is held across check-miss-compute-store, so concurrent
//!   callers on the same key wait for the first computation instead of
//!   repeating it. The map shard lock is only held while fetching the slot.
//!
//! Design decisions:
//! - Lazy eviction only; no background sweep
//! - Optional capacity bound evicts the oldest populated entry on insert
//! - Failed computations (`get_or_try_compute`) are not cached
//! - A compute closure must not re-enter the cache with its own key

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// A cached payload and the instant it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub payload: V,
    pub stored_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<CacheEntry<V>>>>;

/// Generic time-to-live key → value store.
pub struct TtlCache<V> {
    slots: DashMap<String, Slot<V>>,
    ttl: Duration,
    capacity: Option<usize>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given TTL, unbounded, on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
            capacity: None,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Bound the number of populated entries.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    /// Read time from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh payload for `key`, if any. Stale entries are evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let mut guard = lock(&slot);
        match self.take_fresh(&mut guard, key) {
            Some(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `payload` under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, payload: V) {
        let slot = self.slot(key);
        {
            let mut guard = lock(&slot);
            *guard = Some(CacheEntry {
                payload,
                stored_at: self.clock.now(),
            });
        }
        self.enforce_capacity(key);
    }

    /// Return the fresh payload for `key`, or compute, store and return it.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.get_or_try_compute(key, || Ok::<V, std::convert::Infallible>(compute())) {
            Ok(payload) => payload,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute).
    /// Errors are returned to the caller and nothing is cached.
    pub fn get_or_try_compute<F, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);
        let inserted = {
            let mut guard = lock(&slot);

            if let Some(payload) = self.take_fresh(&mut guard, key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(payload);
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            let payload = compute()?;
            *guard = Some(CacheEntry {
                payload: payload.clone(),
                stored_at: self.clock.now(),
            });
            payload
        };

        self.enforce_capacity(key);
        Ok(inserted)
    }

    /// Drop the entry for `key`.
    pub fn invalidate(&self, key: &str) {
        self.slots.remove(key);
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Cache statistics for monitoring and debugging.
    pub fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .iter()
            .filter(|slot| match slot.value().try_lock() {
                Ok(guard) => guard.is_some(),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
                // Being computed right now
                Err(TryLockError::WouldBlock) => true,
            })
            .count();

        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, key: &str) -> Slot<V> {
        Arc::clone(self.slots.entry(key.to_owned()).or_default().value())
    }

    /// Clone out a fresh payload, evicting it first if it has expired.
    fn take_fresh(&self, guard: &mut MutexGuard<'_, Option<CacheEntry<V>>>, key: &str) -> Option<V> {
        let entry = guard.as_ref()?;
        let age = self.clock.now().saturating_duration_since(entry.stored_at);
        if age < self.ttl {
            return Some(entry.payload.clone());
        }

        debug!(key, age_ms = age.as_millis() as u64, "evicting stale cache entry");
        **guard = None;
        self.evictions.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Evict oldest populated entries (other than `keep`) while over capacity.
    fn enforce_capacity(&self, keep: &str) {
        let Some(capacity) = self.capacity else {
            return;
        };

        loop {
            let mut populated = 0usize;
            let mut oldest: Option<(String, Instant)> = None;

            for slot in self.slots.iter() {
                let stored_at = match slot.value().try_lock() {
                    Ok(guard) => guard.as_ref().map(|e| e.stored_at),
                    Err(_) => None,
                };
                let Some(stored_at) = stored_at else {
                    continue;
                };
                populated += 1;
                if slot.key() == keep {
                    continue;
                }
                if oldest.as_ref().map_or(true, |(_, t)| stored_at < *t) {
                    oldest = Some((slot.key().clone(), stored_at));
                }
            }

            match oldest {
                Some((key, _)) if populated > capacity => {
                    debug!(key = key.as_str(), capacity, "evicting oldest cache entry");
                    self.slots.remove(&key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                _ => break,
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of populated entries
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Stale and capacity evictions
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
