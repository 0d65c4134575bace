//! One-shot completion primitive.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Create a linked completion handle and future.
///
/// The [`Deferred`] side settles exactly once with a value or an error; the
/// [`DeferredFuture`] side is awaited by a single observer.
pub(crate) fn deferred<T>() -> (Deferred<T>, DeferredFuture<T>) {
    let (tx, rx) = oneshot::channel();
    (Deferred { tx: Some(tx) }, DeferredFuture { rx })
}

/// The completion side of a one-shot pair.
///
/// `resolve` and `reject` are idempotent: only the first call takes effect,
/// subsequent calls are no-ops.
pub(crate) struct Deferred<T> {
    tx: Option<oneshot::Sender<Result<T>>>,
}

impl<T> Deferred<T> {
    /// Complete with a value.
    ///
    /// Returns `Err(value)` if the value was not delivered, either because
    /// the deferred already settled or because the observer went away.
    pub(crate) fn resolve(&mut self, value: T) -> std::result::Result<(), T> {
        match self.tx.take() {
            Some(tx) => tx.send(Ok(value)).map_err(|rejected| match rejected {
                Ok(value) => value,
                Err(_) => unreachable!("send returns the payload it was given"),
            }),
            None => Err(value),
        }
    }

    /// Complete with an error. Returns `true` if the error was delivered.
    pub(crate) fn reject(&mut self, error: Error) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(Err(error)).is_ok(),
            None => false,
        }
    }

    /// Whether `resolve` or `reject` has already fired.
    pub(crate) fn is_settled(&self) -> bool {
        self.tx.is_none()
    }

    /// Whether the observer dropped its future without awaiting it.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.tx.as_ref().is_some_and(oneshot::Sender::is_closed)
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// The observer side of a one-shot pair.
///
/// Resolves with the value passed to [`Deferred::resolve`] or the error
/// passed to [`Deferred::reject`]. If the completion side is dropped without
/// settling (the pool went away), resolves with [`Error::Draining`].
pub(crate) struct DeferredFuture<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for DeferredFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Draining)),
            Poll::Pending => Poll::Pending,
        }
    }
}
