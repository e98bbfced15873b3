//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::HookError;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// Cache operations on their own cannot fail. The only failure surface is the
/// caller-supplied eviction hook, whose error is carried through unchanged.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The eviction hook returned an error
    #[error("Eviction hook failed: {0}")]
    Hook(#[source] HookError),
}

impl CacheError {
    /// Returns the error produced by the eviction hook.
    pub fn into_hook_error(self) -> HookError {
        match self {
            CacheError::Hook(err) => err,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
