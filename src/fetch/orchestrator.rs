//! Fetch Orchestrator
//!
//! Runs one fetch cycle: cache lookup, network attempts with a fixed retry
//! delay, and a terminal state write guarded by the cycle marker.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CacheEntry};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::fetch::{CycleContext, CycleMarker};
use crate::state::StateStore;
use crate::transport::{classify_response, Transport};

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Answered from a fresh cache entry
    CacheHit,
    /// A network attempt succeeded
    Success,
    /// The cycle's token was observed cancelled
    Aborted,
    /// Every attempt failed
    Exhausted,
    /// A newer cycle took over; nothing was written
    Superseded,
}

// == Orchestrator ==
/// Shared machinery for running cycles of one controller.
pub struct Orchestrator<T> {
    config: FetchConfig,
    cache: Arc<dyn CacheBackend>,
    transport: Arc<dyn Transport>,
    state: Arc<StateStore<T>>,
    marker: CycleMarker,
}

impl<T> Orchestrator<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        config: FetchConfig,
        cache: Arc<dyn CacheBackend>,
        transport: Arc<dyn Transport>,
        state: Arc<StateStore<T>>,
        marker: CycleMarker,
    ) -> Self {
        Self {
            config,
            cache,
            transport,
            state,
            marker,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<StateStore<T>> {
        &self.state
    }

    pub fn marker(&self) -> &CycleMarker {
        &self.marker
    }

    // == Run ==
    /// Drives `ctx` to its terminal state.
    pub async fn run(&self, ctx: CycleContext) -> CycleOutcome {
        // Cache is consulted once, before the first attempt only
        if ctx.use_cache {
            if let Some(data) = self.read_fresh(&ctx).await {
                info!("Cycle {}: fresh cache hit for {}", ctx.id, ctx.key());
                return self.publish_success(&ctx, data, CycleOutcome::CacheHit);
            }
        }

        let attempts = self.config.attempts();
        let mut attempt: u32 = 0;

        loop {
            debug!(
                "Cycle {}: attempt {}/{} for {}",
                ctx.id,
                attempt + 1,
                attempts,
                ctx.key()
            );

            let failure = match self.attempt(&ctx).await {
                Ok((body, data)) => {
                    // A late success must not outlive an abort
                    if ctx.token.is_cancelled() {
                        return self.publish_error(&ctx, FetchError::Aborted);
                    }
                    self.write_cache(&ctx, body).await;
                    return self.publish_success(&ctx, data, CycleOutcome::Success);
                }
                Err(err) => err,
            };

            if ctx.token.is_cancelled() {
                return self.publish_error(&ctx, FetchError::Aborted);
            }

            if !failure.is_retryable() {
                warn!("Cycle {}: {} failed without retry: {}", ctx.id, ctx.key(), failure);
                return self.publish_error(&ctx, failure);
            }

            if attempt + 1 >= attempts {
                warn!(
                    "Cycle {}: giving up on {} after {} attempts: {}",
                    ctx.id,
                    ctx.key(),
                    attempts,
                    failure
                );
                return self.publish_error(
                    &ctx,
                    FetchError::RetryExhausted {
                        attempts,
                        last: Box::new(failure),
                    },
                );
            }

            if !self.marker.is_current(ctx.id) {
                debug!("Cycle {}: superseded, skipping retries", ctx.id);
                return CycleOutcome::Superseded;
            }

            warn!(
                "Cycle {}: attempt {} for {} failed, retrying in {:?}: {}",
                ctx.id,
                attempt + 1,
                ctx.key(),
                self.config.retry_interval,
                failure
            );

            tokio::select! {
                biased;
                _ = ctx.token.cancelled() => {
                    return self.publish_error(&ctx, FetchError::Aborted);
                }
                _ = tokio::time::sleep(self.config.retry_interval) => {}
            }

            attempt += 1;
        }
    }

    /// One network round trip, classified and decoded.
    async fn attempt(&self, ctx: &CycleContext) -> Result<(Value, T)> {
        let response = self.transport.send(&ctx.request, &ctx.token).await?;
        let body = classify_response(response)?;
        let data = decode(&body)?;
        Ok((body, data))
    }

    async fn read_fresh(&self, ctx: &CycleContext) -> Option<T> {
        let entry = match self.cache.read(ctx.key()).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "Cycle {}: {} cache read failed for {}: {}",
                    ctx.id,
                    self.cache.name(),
                    ctx.key(),
                    err
                );
                return None;
            }
        };

        if !entry.is_fresh(self.config.cache_ttl) {
            debug!("Cycle {}: cached entry for {} is stale", ctx.id, ctx.key());
            return None;
        }

        match decode(&entry.body) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(
                    "Cycle {}: ignoring undecodable cache entry for {}: {}",
                    ctx.id,
                    ctx.key(),
                    err
                );
                None
            }
        }
    }

    async fn write_cache(&self, ctx: &CycleContext, body: Value) {
        if let Err(err) = self.cache.write(ctx.key(), CacheEntry::new(body)).await {
            warn!(
                "Cycle {}: {} cache write failed for {}: {}",
                ctx.id,
                self.cache.name(),
                ctx.key(),
                err
            );
        }
    }

    // == Guarded Writes ==

    fn publish_success(&self, ctx: &CycleContext, data: T, outcome: CycleOutcome) -> CycleOutcome {
        let marker = &self.marker;
        let written = self.state.set_if(|state| {
            if !marker.is_current(ctx.id) {
                return false;
            }
            state.mark_success(data);
            true
        });

        if written {
            info!("Cycle {}: {} loaded", ctx.id, ctx.key());
            outcome
        } else {
            debug!("Cycle {}: superseded, discarding success", ctx.id);
            CycleOutcome::Superseded
        }
    }

    fn publish_error(&self, ctx: &CycleContext, err: FetchError) -> CycleOutcome {
        let outcome = match err {
            FetchError::Aborted => CycleOutcome::Aborted,
            _ => CycleOutcome::Exhausted,
        };
        let info = err.to_error_info();
        let marker = &self.marker;
        let written = self.state.set_if(|state| {
            if !marker.is_current(ctx.id) {
                return false;
            }
            state.mark_error(info);
            true
        });

        if written {
            if outcome == CycleOutcome::Aborted {
                info!("Cycle {}: {} aborted by the user", ctx.id, ctx.key());
            }
            outcome
        } else {
            debug!("Cycle {}: superseded, discarding error", ctx.id);
            CycleOutcome::Superseded
        }
    }
}

fn decode<T: DeserializeOwned>(body: &Value) -> Result<T> {
    T::deserialize(body).map_err(|e| FetchError::Decode(e.to_string()))
}
