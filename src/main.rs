//! Lazy TTL Cache - demo runner
//!
//! Fills a sync and an async cache with entries of mixed TTLs, then reads
//! them back over time so the lazy eviction and hook calls show up in the logs.

use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lazy_ttl_cache::{AsyncCache, AsyncCacheOptions, Cache, CacheOptions, CacheStats, Config};

const KEYS: [&str; 4] = ["short", "default", "long", "forever"];

/// Entry point: runs the mixed-TTL walkthrough on both cache variants.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Run the walkthrough on the sync cache
/// 4. Run it again on the async cache
/// 5. Print final statistics as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazy_ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if config.default_ttl_ms == 0 {
        config.default_ttl_ms = 200;
    }
    info!(
        "Configuration loaded: default_ttl={}ms",
        config.default_ttl_ms
    );

    // The sync walkthrough sleeps on the thread, keep it off the runtime workers
    let blocking_config = config.clone();
    let sync_stats = tokio::task::spawn_blocking(move || run_sync(&blocking_config)).await??;
    let async_stats = run_async(&config).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "sync": sync_stats,
            "async": async_stats,
        }))?
    );
    Ok(())
}

fn run_sync(config: &Config) -> anyhow::Result<CacheStats> {
    let mut cache = Cache::new(
        CacheOptions::from_config(config)
            .on_delete(|value: &String| info!("[sync] evicted {}", value)),
    );

    for (key, ttl) in ttls(config) {
        cache.set(key, key.to_string(), ttl);
    }

    for wait_ms in [120, 130, 70] {
        std::thread::sleep(Duration::from_millis(wait_ms));
        for key in KEYS {
            let present = cache.get(key)?.is_some();
            info!("[sync] {} present={}", key, present);
        }
    }

    cache.clear()?;
    Ok(cache.stats())
}

async fn run_async(config: &Config) -> anyhow::Result<CacheStats> {
    let cache = AsyncCache::new(AsyncCacheOptions::from_config(config).on_delete(
        |value: String| async move {
            // Stand-in for releasing an external resource
            tokio::time::sleep(Duration::from_millis(5)).await;
            info!("[async] evicted {}", value);
        },
    ));

    for (key, ttl) in ttls(config) {
        cache.set(key, key.to_string(), ttl).await;
    }

    for wait_ms in [120, 130, 70] {
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        for key in KEYS {
            let present = cache.get(key).await?.is_some();
            info!("[async] {} present={}", key, present);
        }
    }

    cache.clear().await?;
    Ok(cache.stats().await)
}

/// TTL per demo key; `None` falls back to the configured default.
fn ttls(config: &Config) -> [(&'static str, Option<u64>); 4] {
    let long = config.default_ttl_ms.saturating_add(100);
    [
        ("short", Some(100)),
        ("default", None),
        ("long", Some(long)),
        ("forever", Some(0)),
    ]
}
