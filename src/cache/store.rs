//! Cache Store Module
//!
//! Synchronous cache: HashMap storage with lazy TTL expiration and an eviction hook.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::cache::{current_timestamp_ms, CacheEntry, CacheOptions, CacheStats, OnDelete};
use crate::error::{CacheError, Result};

// == Cache ==
/// Synchronous key-value cache with per-entry TTL.
///
/// Expired entries are never swept in the background. They stay in the map
/// until a `get`, `delete` or `clear` touches them.
///
/// All operations take `&mut self`; share a cache across threads by wrapping
/// it in a lock.
pub struct Cache<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Activity counters
    stats: CacheStats,
    /// TTL in milliseconds for entries set without explicit TTL, 0 = never expire
    default_ttl_ms: u64,
    /// Receives every value leaving the cache through eviction
    on_delete: OnDelete<T>,
}

impl<T> Cache<T> {
    // == Constructor ==
    /// Creates an empty cache from the given options.
    pub fn new(options: CacheOptions<T>) -> Self {
        debug!(
            "Creating cache with default_ttl={}ms",
            options.default_ttl_ms
        );
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
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
    pub fn set(&mut self, key: impl Into<String>, value: T, ttl_ms: Option<u64>) {
        let ttl_ms = ttl_ms.unwrap_or(self.default_ttl_ms);
        let entry = CacheEntry::new(value, ttl_ms, current_timestamp_ms());
        self.entries.insert(key.into(), entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// An expired entry is handed to the eviction hook, then removed and
    /// reported as absent. If the hook fails the entry stays in place and the
    /// failure is returned as [`CacheError::Hook`].
    pub fn get(&mut self, key: &str) -> Result<Option<&T>> {
        let now = current_timestamp_ms();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                debug!("Evicting expired key: {}", key);
                (self.on_delete)(&entry.value).map_err(CacheError::Hook)?;
                true
            }
            Some(_) => false,
            None => {
                self.stats.record_miss();
                return Ok(None);
            }
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.entries.len());
            return Ok(None);
        }

        self.stats.record_hit();
        Ok(self.entries.get(key).map(|entry| &entry.value))
    }

    // == Delete ==
    /// Hands the value stored under `key` to the hook, expired or not, then
    /// removes the entry.
    ///
    /// Returns `false` without calling the hook when the key is absent. A
    /// failing hook leaves the entry in place.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(false);
        };

        debug!("Deleting key: {}", key);
        (self.on_delete)(&entry.value).map_err(CacheError::Hook)?;

        self.entries.remove(key);
        self.stats.record_eviction();
        self.stats.set_total_entries(self.entries.len());
        Ok(true)
    }

    // == Clear ==
    /// Calls the hook once per stored value in map order, removing each entry
    /// whose hook succeeds.
    ///
    /// Every value reaches the hook even if an earlier call fails. Entries whose
    /// hook failed are kept and the first failure is returned.
    pub fn clear(&mut self) -> Result<()> {
        let before = self.entries.len();
        let on_delete = &mut self.on_delete;
        let stats = &mut self.stats;
        let mut first_err = None;

        self.entries.retain(|key, entry| match on_delete(&entry.value) {
            Ok(()) => {
                trace!("Clearing key: {}", key);
                stats.record_eviction();
                false
            }
            Err(err) => {
                first_err.get_or_insert(err);
                true
            }
        });

        self.stats.set_total_entries(self.entries.len());
        debug!("Cleared {} of {} entries", before - self.entries.len(), before);

        match first_err {
            Some(err) => Err(CacheError::Hook(err)),
            None => Ok(()),
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the default TTL in milliseconds.
    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }

    // == Length ==
    /// Returns the number of entries held, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl<T> fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.entries.len())
            .field("default_ttl_ms", &self.default_ttl_ms)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread::sleep;
    use std::time::Duration;

    /// Builds a cache whose hook records every evicted value.
    fn recording_cache(default_ttl_ms: u64) -> (Cache<String>, Arc<Mutex<Vec<String>>>) {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let cache = Cache::new(
            CacheOptions::new()
                .default_ttl_ms(default_ttl_ms)
                .on_delete(move |v: &String| sink.lock().unwrap().push(v.clone())),
        );
        (cache, evicted)
    }

    #[test]
    fn test_cache_new() {
        let cache = Cache::<String>::default();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.default_ttl_ms(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("key1", "value1".to_string(), None);

        assert_eq!(cache.get("key1").unwrap(), Some(&"value1".to_string()));
        assert_eq!(cache.len(), 1);
        assert!(evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_get_nonexistent() {
        let (mut cache, evicted) = recording_cache(0);

        assert_eq!(cache.get("nonexistent").unwrap(), None);
        assert!(evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_default_ttl_never_expires() {
        let (mut cache, _) = recording_cache(0);

        cache.set("key1", "value1".to_string(), None);
        sleep(Duration::from_millis(30));

        assert!(cache.get("key1").unwrap().is_some());
    }

    #[test]
    fn test_ttl_expiration_invokes_hook_once() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("key1", "value1".to_string(), Some(20));
        assert!(cache.get("key1").unwrap().is_some());

        sleep(Duration::from_millis(40));

        assert_eq!(cache.get("key1").unwrap(), None);
        assert_eq!(cache.get("key1").unwrap(), None);
        assert_eq!(*evicted.lock().unwrap(), vec!["value1".to_string()]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_stays_until_touched() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("key1", "value1".to_string(), Some(10));
        sleep(Duration::from_millis(30));

        assert_eq!(cache.len(), 1);
        assert!(evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_ttl_overrides_default() {
        let (mut cache, _) = recording_cache(10);

        cache.set("forever", "value".to_string(), Some(0));
        cache.set("default", "value".to_string(), None);
        sleep(Duration::from_millis(30));

        assert!(cache.get("forever").unwrap().is_some());
        assert!(cache.get("default").unwrap().is_none());
    }

    #[test]
    fn test_overwrite_does_not_invoke_hook() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("key1", "value1".to_string(), None);
        cache.set("key1", "value2".to_string(), None);

        assert_eq!(cache.get("key1").unwrap(), Some(&"value2".to_string()));
        assert_eq!(cache.len(), 1);
        assert!(evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_resets_expiration() {
        let (mut cache, _) = recording_cache(0);

        cache.set("key1", "short".to_string(), Some(10));
        cache.set("key1", "long".to_string(), Some(0));
        sleep(Duration::from_millis(30));

        assert_eq!(cache.get("key1").unwrap(), Some(&"long".to_string()));
    }

    #[test]
    fn test_delete() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("key1", "value1".to_string(), None);

        assert!(cache.delete("key1").unwrap());
        assert!(cache.is_empty());
        assert_eq!(cache.get("key1").unwrap(), None);
        assert_eq!(*evicted.lock().unwrap(), vec!["value1".to_string()]);
    }

    #[test]
    fn test_delete_nonexistent() {
        let (mut cache, evicted) = recording_cache(0);

        assert!(!cache.delete("nonexistent").unwrap());
        assert!(evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delete_expired_entry_still_invokes_hook() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("key1", "stale".to_string(), Some(10));
        sleep(Duration::from_millis(30));

        assert!(cache.delete("key1").unwrap());
        assert_eq!(*evicted.lock().unwrap(), vec!["stale".to_string()]);
    }

    #[test]
    fn test_clear_invokes_hook_for_every_entry() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), Some(10));
        cache.set("c", "3".to_string(), None);
        sleep(Duration::from_millis(30));

        cache.clear().unwrap();

        let mut seen = evicted.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["1", "2", "3"]);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a").unwrap(), None);
    }

    #[test]
    fn test_clear_twice_invokes_hook_once_per_entry() {
        let (mut cache, evicted) = recording_cache(0);

        cache.set("a", "1".to_string(), None);
        cache.clear().unwrap();
        cache.clear().unwrap();

        assert_eq!(evicted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_hook_error_propagates_from_get() {
        let mut cache = Cache::new(CacheOptions::new().try_on_delete(|_: &u32| Err("hook failed")));

        cache.set("key1", 1, Some(10));
        sleep(Duration::from_millis(30));

        let err = cache.get("key1").unwrap_err();
        assert!(matches!(err, CacheError::Hook(_)));
        assert_eq!(err.into_hook_error().to_string(), "hook failed");
        // Still stored, the next access retries the hook
        assert_eq!(cache.len(), 1);
        assert!(cache.get("key1").is_err());
    }

    #[test]
    fn test_failed_delete_keeps_entry() {
        let mut cache = Cache::new(CacheOptions::new().try_on_delete(|_: &u32| Err("hook failed")));

        cache.set("key1", 1, None);

        assert!(matches!(cache.delete("key1"), Err(CacheError::Hook(_))));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key1").unwrap(), Some(&1));
        assert!(cache.delete("key1").is_err());
    }

    #[test]
    fn test_delete_succeeds_once_hook_recovers() {
        let attempts = Arc::new(Mutex::new(0));
        let counter = attempts.clone();
        let mut cache = Cache::new(CacheOptions::new().try_on_delete(move |_: &u32| {
            let mut attempts = counter.lock().unwrap();
            *attempts += 1;
            if *attempts == 1 {
                Err("transient")
            } else {
                Ok(())
            }
        }));

        cache.set("key1", 1, None);

        assert!(cache.delete("key1").is_err());
        assert!(cache.delete("key1").unwrap());
        assert!(cache.is_empty());
        assert_eq!(*attempts.lock().unwrap(), 2);
    }

    #[test]
    fn test_clear_runs_every_hook_despite_failures() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut cache = Cache::new(CacheOptions::new().try_on_delete(move |v: &u32| {
            *counter.lock().unwrap() += 1;
            if v % 2 == 0 {
                Err(format!("even value {}", v))
            } else {
                Ok(())
            }
        }));

        for i in 0..5 {
            cache.set(format!("key{}", i), i, None);
        }

        assert!(matches!(cache.clear(), Err(CacheError::Hook(_))));
        assert_eq!(*calls.lock().unwrap(), 5);
        // Only the entries whose hook failed survive
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("key1").unwrap(), None);
        assert_eq!(cache.get("key2").unwrap(), Some(&2));
    }

    #[test]
    fn test_stats() {
        let (mut cache, _) = recording_cache(0);

        cache.set("key1", "value1".to_string(), None);
        cache.set("key2", "value2".to_string(), Some(10));
        cache.get("key1").unwrap(); // hit
        cache.get("nonexistent").unwrap(); // miss
        sleep(Duration::from_millis(30));
        cache.get("key2").unwrap(); // expiration
        cache.delete("key1").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.total_entries, 0);
    }
}
