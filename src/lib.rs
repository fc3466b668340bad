//! Fetch Cache - A client-side data-fetching controller
//!
//! Issues a request for a resource, caches successful responses with a TTL,
//! retries failures with a fixed delay, and lets the caller abort.

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod models;
pub mod state;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cache::{CacheBackend, CacheEntry, MemoryCache};
pub use config::FetchConfig;
pub use controller::{FetchController, FetchControllerBuilder};
pub use error::FetchError;
pub use models::{ControllerState, ErrorInfo, FetchRequest, ResponseData};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
