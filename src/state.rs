//! State Store
//!
//! Single write point for a controller's visible state. Every write is a
//! transform applied to the previous snapshot, and subscribers are notified
//! through a `tokio::sync::watch` channel.

use tokio::sync::watch;

use crate::models::ControllerState;

/// Observable holder of a `ControllerState<T>`.
#[derive(Debug)]
pub struct StateStore<T> {
    tx: watch::Sender<ControllerState<T>>,
}

impl<T: Clone> StateStore<T> {
    pub fn new(initial: ControllerState<T>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    // == Get ==
    /// Snapshot of the current state.
    pub fn get(&self) -> ControllerState<T> {
        self.tx.borrow().clone()
    }

    // == Set ==
    /// Applies `transform` to the current state and notifies subscribers.
    pub fn set<F>(&self, transform: F)
    where
        F: FnOnce(&mut ControllerState<T>),
    {
        self.tx.send_modify(transform);
    }

    /// Applies `transform` under the state lock; subscribers are notified only
    /// when it returns `true`.
    ///
    /// The transform must leave the state untouched when it returns `false`.
    pub fn set_if<F>(&self, transform: F) -> bool
    where
        F: FnOnce(&mut ControllerState<T>) -> bool,
    {
        self.tx.send_if_modified(transform)
    }

    // == Subscribe ==
    pub fn subscribe(&self) -> watch::Receiver<ControllerState<T>> {
        self.tx.subscribe()
    }

    /// Resolves with the first snapshot that is neither idle nor loading.
    pub async fn wait_until_settled(&self) -> ControllerState<T> {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let settled = match rx.wait_for(|state| state.is_settled()).await {
            Ok(state) => state.clone(),
            Err(_) => self.get(),
        };
        settled
    }
}

impl<T: Clone> Default for StateStore<T> {
    fn default() -> Self {
        Self::new(ControllerState::idle())
    }
}
