//! Lazy TTL Cache - An in-process key-value cache
//!
//! Provides per-entry and default TTL expiration with lazy eviction on access,
//! in a synchronous and an asynchronous flavour sharing the same policy.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{AsyncCache, AsyncCacheOptions, Cache, CacheOptions, CacheStats};
pub use config::Config;
pub use error::{CacheError, Result};
