//! Request-scoped cancellation.
//!
//! Each inbound request owns a [`CancelHandle`]; the matching
//! [`CancelContext`] is threaded through every store call. Calling
//! [`CancelHandle::cancel`] or dropping the handle resolves every in-flight
//! fetch to a cancelled error and releases it.

use crate::error::{ScoutingError, StoreError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Marker produced when a request is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl From<Cancelled> for StoreError {
    fn from(_: Cancelled) -> Self {
        StoreError::Cancelled
    }
}

impl From<Cancelled> for ScoutingError {
    fn from(_: Cancelled) -> Self {
        ScoutingError::Cancelled
    }
}

/// Owned by whoever decides the request is abandoned.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cheap to clone; observes a single [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct CancelContext {
    rx: watch::Receiver<bool>,
    // Keeps the channel open for contexts with no external handle.
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl CancelContext {
    /// A linked handle/context pair.
    pub fn pair() -> (CancelHandle, CancelContext) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            CancelContext {
                rx,
                _keepalive: None,
            },
        )
    }

    /// A context that is never cancelled.
    pub fn none() -> CancelContext {
        let (tx, rx) = watch::channel(false);
        CancelContext {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the request is cancelled or its handle dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Race `fut` against cancellation.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Cancelled>,
    {
        if self.is_cancelled() {
            return Err(Cancelled.into());
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled.into()),
            result = fut => result,
        }
    }
}

impl Default for CancelContext {
    fn default() -> Self {
        Self::none()
    }
}
