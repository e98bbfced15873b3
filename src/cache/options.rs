//! Cache Options
//!
//! Construction parameters for [`Cache`](super::Cache) and
//! [`AsyncCache`](super::AsyncCache).

use std::fmt;
use std::future::Future;

use crate::cache::hook::{self, AsyncOnDelete, HookError, OnDelete};
use crate::config::Config;

// == Sync Options ==
/// Options for the synchronous cache.
pub struct CacheOptions<T> {
    /// Default TTL in milliseconds, `0` = entries never expire
    pub default_ttl_ms: u64,
    pub(crate) on_delete: OnDelete<T>,
}

impl<T> CacheOptions<T> {
    /// Creates options with no default TTL and a no-op hook.
    pub fn new() -> Self {
        Self {
            default_ttl_ms: 0,
            on_delete: hook::noop(),
        }
    }

    /// Creates options seeded from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::new().default_ttl_ms(config.default_ttl_ms)
    }

    /// Sets the TTL applied when `set` is called without one.
    pub fn default_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    /// Sets an eviction hook that cannot fail.
    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.on_delete = hook::infallible(f);
        self
    }

    /// Sets an eviction hook whose errors propagate to the triggering call.
    ///
    /// An entry whose hook fails stays in the cache.
    pub fn try_on_delete<F, E>(mut self, f: F) -> Self
    where
        F: FnMut(&T) -> std::result::Result<(), E> + Send + 'static,
        E: Into<HookError>,
    {
        self.on_delete = hook::fallible(f);
        self
    }
}

impl<T> Default for CacheOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CacheOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("default_ttl_ms", &self.default_ttl_ms)
            .finish_non_exhaustive()
    }
}

// == Async Options ==
/// Options for the asynchronous cache.
pub struct AsyncCacheOptions<T> {
    /// Default TTL in milliseconds, `0` = entries never expire
    pub default_ttl_ms: u64,
    pub(crate) on_delete: AsyncOnDelete<T>,
}

impl<T> AsyncCacheOptions<T> {
    /// Creates options with no default TTL and a no-op hook.
    pub fn new() -> Self {
        Self {
            default_ttl_ms: 0,
            on_delete: hook::noop_async(),
        }
    }

    /// Creates options seeded from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::new().default_ttl_ms(config.default_ttl_ms)
    }

    /// Sets the TTL applied when `set` is called without one.
    pub fn default_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    /// Sets an asynchronous eviction hook that cannot fail.
    pub fn on_delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_delete = hook::infallible_async(f);
        self
    }

    /// Sets an asynchronous eviction hook whose errors propagate to the
    /// triggering call.
    ///
    /// An entry whose `delete` or `clear` hook fails stays in the cache.
    pub fn try_on_delete<F, Fut, E>(mut self, f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Into<HookError>,
    {
        self.on_delete = hook::fallible_async(f);
        self
    }
}

impl<T> Default for AsyncCacheOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AsyncCacheOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCacheOptions")
            .field("default_ttl_ms", &self.default_ttl_ms)
            .finish_non_exhaustive()
    }
}
