//! Eviction Hooks
//!
//! Callbacks invoked with a value when it leaves the cache through `get`
//! (expired), `delete` or `clear`. The sync hook borrows the value while it is
//! still stored; the async hook owns a value it can carry across await points.

use std::error::Error;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};

/// Error raised by an eviction hook, passed through to the caller untouched.
pub type HookError = Box<dyn Error + Send + Sync + 'static>;

/// Outcome of a single hook invocation.
pub type HookResult = std::result::Result<(), HookError>;

/// Synchronous eviction hook.
pub type OnDelete<T> = Box<dyn FnMut(&T) -> HookResult + Send>;

/// Asynchronous eviction hook returning a future the cache awaits.
pub type AsyncOnDelete<T> = Box<dyn Fn(T) -> BoxFuture<'static, HookResult> + Send + Sync>;

// == Sync Hook Constructors ==
pub(crate) fn noop<T>() -> OnDelete<T> {
    Box::new(|_: &T| Ok(()))
}

pub(crate) fn infallible<T, F>(mut f: F) -> OnDelete<T>
where
    F: FnMut(&T) + Send + 'static,
{
    Box::new(move |value: &T| {
        f(value);
        Ok(())
    })
}

pub(crate) fn fallible<T, F, E>(mut f: F) -> OnDelete<T>
where
    F: FnMut(&T) -> std::result::Result<(), E> + Send + 'static,
    E: Into<HookError>,
{
    Box::new(move |value: &T| f(value).map_err(Into::into))
}

// == Async Hook Constructors ==
pub(crate) fn noop_async<T>() -> AsyncOnDelete<T> {
    Box::new(|_| futures::future::ready(Ok(())).boxed())
}

pub(crate) fn infallible_async<T, F, Fut>(f: F) -> AsyncOnDelete<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |value| f(value).map(Ok).boxed())
}

pub(crate) fn fallible_async<T, F, Fut, E>(f: F) -> AsyncOnDelete<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
    E: Into<HookError>,
{
    Box::new(move |value| f(value).map(|res| res.map_err(Into::into)).boxed())
}
