//! Pending acquisition requests.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::deferred::Deferred;
use crate::error::Error;

/// A pending acquisition sitting in the waiter queue.
///
/// Wraps the [`Deferred`] the caller awaits, the creation timestamp, and an
/// optional timer task. The timer rejects the request with
/// [`Error::Timeout`] if it is still queued at the deadline; any terminal
/// transition aborts the timer.
pub(crate) struct ResourceRequest<T> {
    id: u64,
    deferred: Deferred<T>,
    created_at: Instant,
    timer: Option<JoinHandle<()>>,
}

impl<T> ResourceRequest<T> {
    pub(crate) fn new(id: u64, deferred: Deferred<T>) -> Self {
        Self {
            id,
            deferred,
            created_at: Instant::now(),
            timer: None,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The absolute deadline for a timeout of `delay`, anchored at the
    /// request's creation. Re-arming with the same delay after some age has
    /// elapsed therefore yields an effective delay of
    /// `max(delay - age, 0)`; a deadline already in the past fires
    /// immediately.
    pub(crate) fn deadline_for(&self, delay: Duration) -> Instant {
        self.created_at + delay
    }

    /// Arm (or re-arm) the timer task. A previously armed timer is
    /// cancelled first.
    pub(crate) fn set_timer(&mut self, timer: JoinHandle<()>) {
        if let Some(old) = self.timer.replace(timer) {
            old.abort();
        }
    }

    fn clear_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Fulfil the request, cancelling any pending timer.
    ///
    /// Returns `Err(value)` if the caller is no longer listening.
    pub(crate) fn resolve(mut self, value: T) -> Result<(), T> {
        self.clear_timer();
        self.deferred.resolve(value)
    }

    /// Reject the request, cancelling any pending timer.
    pub(crate) fn reject(mut self, error: Error) -> bool {
        self.clear_timer();
        self.deferred.reject(error)
    }

    /// Whether the caller dropped its acquire future. Abandoned requests
    /// are skipped at dispatch instead of consuming a resource.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.deferred.is_abandoned()
    }
}

impl<T> Drop for ResourceRequest<T> {
    fn drop(&mut self) {
        self.clear_timer();
    }
}

impl<T> std::fmt::Debug for ResourceRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRequest")
            .field("id", &self.id)
            .field("timed", &self.timer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::deferred::deferred;

    #[tokio::test]
    async fn resolve_delivers_to_caller() {
        let (tx, rx) = deferred();
        let request = ResourceRequest::new(1, tx);
        assert!(request.resolve("db-conn").is_ok());
        assert_eq!(rx.await.unwrap(), "db-conn");
    }

    #[tokio::test]
    async fn abandoned_request_is_detected() {
        let (tx, rx) = deferred::<u8>();
        let request = ResourceRequest::new(2, tx);
        assert!(!request.is_abandoned());
        drop(rx);
        assert!(request.is_abandoned());
    }

    #[test]
    fn deadline_accounts_for_age() {
        let (tx, _rx) = deferred::<u8>();
        let request = ResourceRequest::new(3, tx);
        let deadline = request.deadline_for(Duration::from_millis(500));
        assert_eq!(deadline, request.created_at() + Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_cancels_pending_timer() {
        let fired = Arc::new(AtomicBool::new(false));
        let fired_c = Arc::clone(&fired);

        let (tx, rx) = deferred();
        let mut request = ResourceRequest::new(4, tx);
        request.set_timer(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            fired_c.store(true, Ordering::SeqCst);
        }));

        assert!(request.resolve(9u8).is_ok());
        assert_eq!(rx.await.unwrap(), 9);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!fired.load(Ordering::SeqCst), "timer must be aborted");
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_cancels_previous_timer() {
        let first = Arc::new(AtomicBool::new(false));
        let first_c = Arc::clone(&first);

        let (tx, _rx) = deferred::<u8>();
        let mut request = ResourceRequest::new(5, tx);
        request.set_timer(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            first_c.store(true, Ordering::SeqCst);
        }));
        request.set_timer(tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!first.load(Ordering::SeqCst), "first timer must be aborted");
    }
}
