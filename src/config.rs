//! Configuration Module
//!
//! Retry, cache and transport settings for the fetch controller, loaded from
//! environment variables with defaults.

use std::env;
use std::time::Duration;

// == Defaults ==
/// Total attempts per fetch cycle (first attempt included)
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Freshness window for cached responses in milliseconds
pub const DEFAULT_CACHE_TTL_MS: u64 = 600_000;
/// Delay between two attempts in milliseconds
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 2_000;
/// Capacity of the in-memory response cache
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 1000;

/// Fetch controller configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total number of network attempts per cycle
    pub max_retries: u32,
    /// How long a cached response stays fresh
    pub cache_ttl: Duration,
    /// Fixed delay before each retry
    pub retry_interval: Duration,
    /// Maximum number of entries held by `MemoryCache`
    pub max_cache_entries: usize,
    /// Optional per-request timeout handed to the HTTP client
    pub request_timeout: Option<Duration>,
}

impl FetchConfig {
    /// Creates a new FetchConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FETCH_MAX_RETRIES` - Total attempts per cycle (default: 3)
    /// - `FETCH_CACHE_TTL_MS` - Cache freshness window in ms (default: 600000)
    /// - `FETCH_RETRY_INTERVAL_MS` - Delay between attempts in ms (default: 2000)
    /// - `FETCH_MAX_CACHE_ENTRIES` - In-memory cache capacity (default: 1000)
    /// - `FETCH_REQUEST_TIMEOUT_MS` - Per-request timeout in ms (default: none)
    pub fn from_env() -> Self {
        Self {
            max_retries: parse_var("FETCH_MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES),
            cache_ttl: Duration::from_millis(
                parse_var("FETCH_CACHE_TTL_MS").unwrap_or(DEFAULT_CACHE_TTL_MS),
            ),
            retry_interval: Duration::from_millis(
                parse_var("FETCH_RETRY_INTERVAL_MS").unwrap_or(DEFAULT_RETRY_INTERVAL_MS),
            ),
            max_cache_entries: parse_var("FETCH_MAX_CACHE_ENTRIES")
                .unwrap_or(DEFAULT_MAX_CACHE_ENTRIES),
            request_timeout: parse_var::<u64>("FETCH_REQUEST_TIMEOUT_MS")
                .map(Duration::from_millis),
        }
    }

    // == Attempts ==
    /// Number of attempts a cycle may make. Never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            request_timeout: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
