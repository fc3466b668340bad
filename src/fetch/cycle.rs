//! Per-cycle context and the latest-cycle marker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::models::FetchRequest;

// == Cycle Context ==
/// Everything one cycle owns. Created at cycle start, dropped at cycle end.
#[derive(Debug, Clone)]
pub struct CycleContext {
    /// Value of the marker when this cycle started
    pub id: u64,
    /// Request snapshot; its identity is fixed for the whole cycle
    pub request: FetchRequest,
    /// Whether the cycle may answer from the cache before its first attempt
    pub use_cache: bool,
    /// This cycle's own token; later cycles never touch it
    pub token: CancellationToken,
}

impl CycleContext {
    pub fn new(id: u64, request: FetchRequest, use_cache: bool) -> Self {
        Self::with_token(id, request, use_cache, CancellationToken::new())
    }

    /// Builds a context around a token the caller already published.
    pub fn with_token(
        id: u64,
        request: FetchRequest,
        use_cache: bool,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            request,
            use_cache,
            token,
        }
    }

    pub fn key(&self) -> &str {
        self.request.identity()
    }
}

// == Cycle Marker ==
/// Shared "latest cycle" counter.
///
/// A cycle may write a terminal state only while its id equals the marker.
/// Bumping the marker therefore revokes that right from every older cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleMarker {
    latest: Arc<AtomicU64>,
}

impl CycleMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new id and makes it the current one.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Revokes the current cycle without starting another.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, id: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_supersedes_previous() {
        let marker = CycleMarker::new();
        let first = marker.begin();
        assert!(marker.is_current(first));

        let second = marker.begin();
        assert!(second > first);
        assert!(!marker.is_current(first));
        assert!(marker.is_current(second));
    }

    #[test]
    fn test_invalidate_revokes_current() {
        let marker = CycleMarker::new();
        let id = marker.begin();
        marker.invalidate();
        assert!(!marker.is_current(id));
    }

    #[test]
    fn test_clones_share_the_counter() {
        let marker = CycleMarker::new();
        let other = marker.clone();
        let id = marker.begin();
        assert!(other.is_current(id));
    }

    #[test]
    fn test_context_owns_fresh_token() {
        let a = CycleContext::new(1, FetchRequest::get("/a"), true);
        let b = CycleContext::new(2, FetchRequest::get("/a"), true);
        a.token.cancel();
        assert!(!b.token.is_cancelled());
        assert_eq!(a.key(), "/a");
    }

    #[test]
    fn test_with_token_shares_the_given_token() {
        let token = CancellationToken::new();
        let ctx = CycleContext::with_token(3, FetchRequest::get("/b"), false, token.clone());
        token.cancel();
        assert!(ctx.token.is_cancelled());
        assert!(!ctx.use_cache);
    }
}
