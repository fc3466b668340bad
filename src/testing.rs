//! Scripted transport shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, Result};
use crate::models::FetchRequest;
use crate::transport::{Transport, TransportResponse};

#[derive(Clone)]
struct Route {
    steps: VecDeque<Result<TransportResponse>>,
    fallback: Result<TransportResponse>,
    delay: Duration,
    honor_cancel: bool,
}

impl Route {
    fn new(fallback: Result<TransportResponse>) -> Self {
        Self {
            steps: VecDeque::new(),
            fallback,
            delay: Duration::ZERO,
            honor_cancel: true,
        }
    }
}

/// Answers requests from per-URL scripts and counts calls.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call to `url` returns `result` once its script is used up.
    pub fn respond(self, url: &str, result: Result<TransportResponse>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .and_modify(|r| r.fallback = result.clone())
            .or_insert_with(|| Route::new(result));
        self
    }

    /// Queues one-shot results for `url`, consumed before the fallback.
    pub fn script(self, url: &str, steps: Vec<Result<TransportResponse>>) -> Self {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .entry(url.to_string())
            .or_insert_with(|| Route::new(Err(FetchError::Transport("unscripted".into()))));
        route.steps.extend(steps);
        drop(routes);
        self
    }

    /// Delays every answer for `url`. With `honor_cancel` false the delay
    /// ignores the token, like a server that answers anyway.
    pub fn delay(self, url: &str, delay: Duration, honor_cancel: bool) -> Self {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .entry(url.to_string())
            .or_insert_with(|| Route::new(Err(FetchError::Transport("unscripted".into()))));
        route.delay = delay;
        route.honor_cancel = honor_cancel;
        drop(routes);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &FetchRequest,
        token: &CancellationToken,
    ) -> Result<TransportResponse> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(request.url.clone())
            .or_insert(0) += 1;

        let (result, delay, honor_cancel) = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&request.url) {
                Some(route) => {
                    let result = route
                        .steps
                        .pop_front()
                        .unwrap_or_else(|| route.fallback.clone());
                    (result, route.delay, route.honor_cancel)
                }
                None => (
                    Ok(TransportResponse::new(404, serde_json::Value::Null)),
                    Duration::ZERO,
                    true,
                ),
            }
        };

        if !delay.is_zero() {
            if honor_cancel {
                tokio::select! {
                    _ = token.cancelled() => {
                        return Err(FetchError::Transport("request cancelled".to_string()));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            } else {
                tokio::time::sleep(delay).await;
            }
        }

        result
    }
}
