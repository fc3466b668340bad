//! Fetch Cache - command line demo
//!
//! Fetches the URL given as first argument, prints the settled state, then
//! refetches through the cache and prints it again.
//!
//! Usage: `fetch_cache <url> [--no-cache]`

use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fetch_cache::{FetchConfig, FetchController, MemoryCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetch_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        bail!("usage: fetch_cache <url> [--no-cache]");
    };
    let use_cache = !args.any(|arg| arg == "--no-cache");

    let config = FetchConfig::from_env();
    info!(
        "Configuration loaded: max_retries={}, cache_ttl={:?}, retry_interval={:?}",
        config.max_retries, config.cache_ttl, config.retry_interval
    );

    let cache = Arc::new(MemoryCache::from_config(&config));
    let controller: FetchController<Value> = FetchController::builder(url.as_str())
        .config(config)
        .cache(cache.clone())
        .build()
        .context("failed to build the HTTP transport")?;

    let first = controller.settled().await;
    println!("{}", serde_json::to_string_pretty(&first)?);

    controller.refetch(use_cache);
    let second = controller.settled().await;
    println!("{}", serde_json::to_string_pretty(&second)?);

    let stats = cache.stats().await;
    info!(
        "Cache stats: hits={}, misses={}, writes={}, hit_rate={:.2}",
        stats.hits,
        stats.misses,
        stats.writes,
        stats.hit_rate()
    );

    if second.error.is_some() {
        bail!("request to {} failed", url);
    }
    Ok(())
}
