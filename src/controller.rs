//! Controller Facade
//!
//! The public surface of the crate: current state, `refetch`, `abort`, and
//! identity changes through `set_request`.
//!
//! # Example
//! ```ignore
//! let cache = Arc::new(MemoryCache::default());
//! let users: FetchController<Vec<User>> = FetchController::builder("https://api.example.com/users")
//!     .cache(cache.clone())
//!     .build()?;
//!
//! let state = users.settled().await;
//! users.refetch(false); // bypass the cache once
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{CacheBackend, MemoryCache};
use crate::config::FetchConfig;
use crate::error::Result;
use crate::fetch::{CycleContext, CycleMarker, Orchestrator};
use crate::models::{ControllerState, FetchRequest};
use crate::state::StateStore;
use crate::transport::{ReqwestTransport, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Fetch Controller ==
/// Fetches one resource, caches it, retries failures and supports abort.
///
/// Creating a controller starts its first cycle, so it must happen inside a
/// Tokio runtime. Later cycles are spawned on that same runtime, so `refetch`,
/// `abort` and `set_request` may be called from any thread. Dropping the
/// controller cancels the in-flight cycle.
pub struct FetchController<T> {
    orchestrator: Arc<Orchestrator<T>>,
    runtime: Handle,
    request: Mutex<FetchRequest>,
    use_cache: AtomicBool,
    current_token: Mutex<CancellationToken>,
}

impl<T> FetchController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a controller and starts fetching `request`.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn new(
        request: impl Into<FetchRequest>,
        config: FetchConfig,
        cache: Arc<dyn CacheBackend>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let state = Arc::new(StateStore::new(ControllerState::idle()));
        let orchestrator = Orchestrator::new(config, cache, transport, state, CycleMarker::new());

        let controller = Self {
            orchestrator: Arc::new(orchestrator),
            runtime: Handle::current(),
            request: Mutex::new(request.into()),
            use_cache: AtomicBool::new(true),
            current_token: Mutex::new(CancellationToken::new()),
        };
        controller.on_idle();
        controller
    }

    pub fn builder(request: impl Into<FetchRequest>) -> FetchControllerBuilder<T> {
        FetchControllerBuilder::new(request)
    }

    // == State ==
    /// Snapshot of the current state.
    pub fn state(&self) -> ControllerState<T> {
        self.store().get()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ControllerState<T>> {
        self.store().subscribe()
    }

    /// Waits until the current cycle has written its terminal state.
    pub async fn settled(&self) -> ControllerState<T> {
        self.store().wait_until_settled().await
    }

    pub fn request(&self) -> FetchRequest {
        lock(&self.request).clone()
    }

    // == Refetch ==
    /// Re-arms the idle state, which starts a new cycle.
    ///
    /// With `use_cache` false the next cycle skips the cache lookup; the flag
    /// reverts to true once that cycle has taken it.
    pub fn refetch(&self, use_cache: bool) {
        self.use_cache.store(use_cache, Ordering::SeqCst);

        let marker = self.orchestrator.marker();
        self.store().set(|state| {
            // Older cycles lose the right to write as soon as we go idle
            marker.invalidate();
            state.mark_idle();
        });

        self.on_idle();
    }

    // == Abort ==
    /// Signals the current cycle's token. Its effects stop at the next checkpoint.
    pub fn abort(&self) {
        let identity = self.request().url;
        let token = lock(&self.current_token);
        if !token.is_cancelled() {
            info!("Aborting request for {}", identity);
            token.cancel();
        }
    }

    // == Identity Change ==
    /// Replaces the request. A new identity starts a fresh cycle; the same
    /// identity only updates what the next cycle will send.
    pub fn set_request(&self, request: impl Into<FetchRequest>) {
        let request = request.into();
        let changed = {
            let mut current = lock(&self.request);
            let changed = current.identity() != request.identity();
            *current = request;
            changed
        };

        if !changed {
            return;
        }

        if self.store().get().is_loading {
            debug!("Identity changed while loading, superseding the in-flight cycle");
        }
        self.refetch(true);
    }

    pub fn config(&self) -> &FetchConfig {
        self.orchestrator.config()
    }

    fn store(&self) -> &Arc<StateStore<T>> {
        self.orchestrator.state()
    }

    /// Turns an observed idle state into exactly one new cycle.
    fn on_idle(&self) {
        let marker = self.orchestrator.marker();
        let token = CancellationToken::new();
        let mut cycle_id = None;

        // Check-and-flip, id allocation and token swap all happen under the
        // state lock, so `abort` always sees the token of the latest cycle.
        // Lock order: state, then token.
        self.store().set_if(|state| {
            if !state.idle {
                return false;
            }
            cycle_id = Some(marker.begin());
            state.mark_loading();

            let previous = std::mem::replace(&mut *lock(&self.current_token), token.clone());
            // Its writes are already revoked; this only stops wasted network work
            previous.cancel();
            true
        });

        let Some(id) = cycle_id else {
            return;
        };

        let use_cache = self.use_cache.swap(true, Ordering::SeqCst);
        let ctx = CycleContext::with_token(id, self.request(), use_cache, token);

        info!(
            "Starting fetch cycle {} for {} (use_cache={})",
            id,
            ctx.key(),
            use_cache
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        self.runtime.spawn(async move {
            let outcome = orchestrator.run(ctx).await;
            debug!("Fetch cycle {} finished: {:?}", id, outcome);
        });
    }
}

impl<T> Drop for FetchController<T> {
    fn drop(&mut self) {
        lock(&self.current_token).cancel();
    }
}

// == Builder ==
/// Wires a `FetchController` from optional parts.
///
/// Defaults: `FetchConfig::from_env()`, a private `MemoryCache`, and a
/// `ReqwestTransport` built from the config.
pub struct FetchControllerBuilder<T> {
    request: FetchRequest,
    config: Option<FetchConfig>,
    cache: Option<Arc<dyn CacheBackend>>,
    transport: Option<Arc<dyn Transport>>,
    _data: std::marker::PhantomData<fn() -> T>,
}

impl<T> FetchControllerBuilder<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(request: impl Into<FetchRequest>) -> Self {
        Self {
            request: request.into(),
            config: None,
            cache: None,
            transport: None,
            _data: std::marker::PhantomData,
        }
    }

    pub fn config(mut self, config: FetchConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shares `cache` with every other controller holding the same `Arc`.
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the controller and starts its first cycle.
    pub fn build(self) -> Result<FetchController<T>> {
        let config = self.config.unwrap_or_else(FetchConfig::from_env);
        let cache = match self.cache {
            Some(cache) => cache,
            None => Arc::new(MemoryCache::from_config(&config)),
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };
        Ok(FetchController::new(self.request, config, cache, transport))
    }
}
