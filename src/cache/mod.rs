//! Cache Module
//!
//! Provides in-memory caching with lazy TTL expiration and eviction hooks.

mod async_store;
mod entry;
mod hook;
mod options;
mod stats;
mod store;


// Re-export public types
pub use async_store::AsyncCache;
pub use entry::{current_timestamp_ms, CacheEntry};
pub use hook::{AsyncOnDelete, HookError, HookResult, OnDelete};
pub use options::{AsyncCacheOptions, CacheOptions};
pub use stats::CacheStats;
pub use store::Cache;
