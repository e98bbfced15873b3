//! Async Cache Store Module
//!
//! Same expiration policy as [`Cache`](super::Cache), with every operation
//! async and an eviction hook that may itself be asynchronous.

use std::collections::HashMap;
use std::fmt;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::cache::{
    current_timestamp_ms, AsyncCacheOptions, AsyncOnDelete, CacheEntry, CacheStats,
};
use crate::error::{CacheError, Result};

/// A stored entry tagged with the `set` call that created it.
struct Slot<T> {
    generation: u64,
    entry: CacheEntry<T>,
}

/// Map and counters, guarded together.
struct CacheState<T> {
    entries: HashMap<String, Slot<T>>,
    next_generation: u64,
    stats: CacheStats,
}

impl<T> CacheState<T> {
    /// Removes `key` only if it still holds the entry from `generation`.
    ///
    /// A `set` that lands while a hook is pending replaces the slot, and the
    /// newer value must survive the removal of the older one.
    fn remove_if_current(&mut self, key: &str, generation: u64) {
        if self
            .entries
            .get(key)
            .is_some_and(|slot| slot.generation == generation)
        {
            self.entries.remove(key);
        }
        self.stats.set_total_entries(self.entries.len());
    }
}

// == Async Cache ==
/// Asynchronous key-value cache with per-entry TTL.
///
/// The map is only touched under a per-instance lock, and the lock is never
/// held while a hook is awaited, so a hook may call back into the cache.
///
/// Ordering of hook and removal:
/// - `get` on an expired entry removes it first, so concurrent lookups already
///   see the key as absent while the hook runs.
/// - `delete` and `clear` await the hook on a clone of the stored value and
///   remove the entry afterwards, only if the hook succeeded.
pub struct AsyncCache<T> {
    state: Mutex<CacheState<T>>,
    default_ttl_ms: u64,
    on_delete: AsyncOnDelete<T>,
}

impl<T> AsyncCache<T> {
    /// Creates an empty cache from the given options.
    pub fn new(options: AsyncCacheOptions<T>) -> Self {
        debug!(
            "Creating async cache with default_ttl={}ms",
            options.default_ttl_ms
        );
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_generation: 0,
                stats: CacheStats::new(),
            }),
            default_ttl_ms: options.default_ttl_ms,
            on_delete: options.on_delete,
        }
    }

    // == Set ==
    /// Stores a value, replacing any previous entry under the same key.
    ///
    /// The displaced value is dropped without calling the eviction hook.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl_ms` - TTL in milliseconds (`None` uses the default, `Some(0)` never expires)
    pub async fn set(&self, key: impl Into<String>, value: T, ttl_ms: Option<u64>) {
        let ttl_ms = ttl_ms.unwrap_or(self.default_ttl_ms);
        let entry = CacheEntry::new(value, ttl_ms, current_timestamp_ms());

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let generation = state.next_generation;
        state.next_generation += 1;
        state.entries.insert(key.into(), Slot { generation, entry });
        state.stats.set_total_entries(state.entries.len());
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    ///
    /// An expired entry is removed before its hook is awaited, so concurrent
    /// lookups already see the key as absent while the hook runs. `get`
    /// resolves once the hook has completed.
    pub async fn get(&self, key: &str) -> Result<Option<T>>
    where
        T: Clone,
    {
        let stale = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let now = current_timestamp_ms();

            match state.entries.get(key) {
                None => {
                    state.stats.record_miss();
                    return Ok(None);
                }
                Some(slot) if !slot.entry.is_expired_at(now) => {
                    state.stats.record_hit();
                    return Ok(Some(slot.entry.value.clone()));
                }
                Some(_) => {}
            }

            let stale = state.entries.remove(key).map(|slot| slot.entry.value);
            state.stats.record_expiration();
            state.stats.set_total_entries(state.entries.len());
            stale
        };

        if let Some(value) = stale {
            debug!("Evicting expired key: {}", key);
            (self.on_delete)(value).await.map_err(CacheError::Hook)?;
        }
        Ok(None)
    }

    // == Delete ==
    /// Awaits the hook on the value stored under `key`, expired or not, then
    /// removes the entry.
    ///
    /// Returns `false` without calling the hook when the key is absent. A
    /// failing hook leaves the entry in place.
    pub async fn delete(&self, key: &str) -> Result<bool>
    where
        T: Clone,
    {
        let (generation, value) = {
            let state = self.state.lock().await;
            match state.entries.get(key) {
                Some(slot) => (slot.generation, slot.entry.value.clone()),
                None => return Ok(false),
            }
        };

        debug!("Deleting key: {}", key);
        (self.on_delete)(value).await.map_err(CacheError::Hook)?;

        let mut state = self.state.lock().await;
        state.remove_if_current(key, generation);
        state.stats.record_eviction();
        Ok(true)
    }

    // == Clear ==
    /// Awaits the hook for every value stored when the call starts, then
    /// removes each entry whose hook succeeded.
    ///
    /// Hooks are issued in map iteration order and run concurrently; `clear`
    /// resolves only after all of them have completed. Entries whose hook
    /// failed are kept and the first failure is returned.
    pub async fn clear(&self) -> Result<()>
    where
        T: Clone,
    {
        let (targets, values): (Vec<_>, Vec<_>) = {
            let state = self.state.lock().await;
            state
                .entries
                .iter()
                .map(|(key, slot)| ((key.clone(), slot.generation), slot.entry.value.clone()))
                .unzip()
        };

        let results = join_all(values.into_iter().map(|value| (self.on_delete)(value))).await;

        let mut state = self.state.lock().await;
        let mut first_err = None;
        let mut cleared = 0;
        for ((key, generation), result) in targets.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    trace!("Clearing key: {}", key);
                    state.remove_if_current(&key, generation);
                    state.stats.record_eviction();
                    cleared += 1;
                }
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        debug!("Cleared {} entries", cleared);

        match first_err {
            Some(err) => Err(CacheError::Hook(err)),
            None => Ok(()),
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    /// Returns the default TTL in milliseconds.
    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }

    /// Returns the number of entries held, including expired ones not yet reaped.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }
}

impl<T> Default for AsyncCache<T> {
    fn default() -> Self {
        Self::new(AsyncCacheOptions::default())
    }
}

impl<T> fmt::Debug for AsyncCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCache")
            .field("default_ttl_ms", &self.default_ttl_ms)
            .finish_non_exhaustive()
    }
}
