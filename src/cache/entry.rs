//! Cache Entry Module
//!
//! A stored response body and the moment it was written. Freshness is
//! evaluated lazily against a TTL on every read; nothing here expires data.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a cached response body with its write timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the body was written to the cache
    pub stored_at: DateTime<Utc>,
    /// The raw response body
    pub body: Value,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(body: Value) -> Self {
        Self::with_stored_at(body, Utc::now())
    }

    /// Creates an entry with an explicit write timestamp.
    pub fn with_stored_at(body: Value, stored_at: DateTime<Utc>) -> Self {
        Self { stored_at, body }
    }

    // == Age ==
    /// Milliseconds elapsed between the write and `now`.
    ///
    /// Negative when `stored_at` lies in the future (clock skew).
    pub fn age_ms_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.stored_at).num_milliseconds()
    }

    // == Freshness ==
    /// Fresh while `now - stored_at < ttl`.
    pub fn is_fresh_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.age_ms_at(now) < ttl_ms
    }

    /// Freshness evaluated against the current time.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(ttl, Utc::now())
    }
}
