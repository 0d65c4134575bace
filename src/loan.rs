//! Loan bookkeeping for borrowed resources.

use std::time::Instant;

use crate::deferred::{deferred, Deferred, DeferredFuture};

/// Bookkeeping record for a borrowed resource.
///
/// One loan exists per borrowed resource, keyed by the resource's pooled id
/// in the engine's loan map. The settle handle completes when the borrower
/// returns the resource (release or destroy); `drain` awaits it.
pub(crate) struct Loan {
    borrowed_at: Instant,
    settle: Deferred<()>,
    settled: Option<DeferredFuture<()>>,
}

impl Loan {
    pub(crate) fn new() -> Self {
        let (settle, settled) = deferred();
        Self {
            borrowed_at: Instant::now(),
            settle,
            settled: Some(settled),
        }
    }

    pub(crate) fn borrowed_at(&self) -> Instant {
        self.borrowed_at
    }

    /// Mark the loan settled. Idempotent.
    pub(crate) fn settle(&mut self) {
        let _ = self.settle.resolve(());
    }

    /// Take the settle future, if nobody took it yet.
    pub(crate) fn take_settled(&mut self) -> Option<DeferredFuture<()>> {
        self.settled.take()
    }
}

impl std::fmt::Debug for Loan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loan")
            .field("borrowed_at", &self.borrowed_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settle_completes_the_future() {
        let mut loan = Loan::new();
        let settled = loan.take_settled().unwrap();
        loan.settle();
        assert!(settled.await.is_ok());
    }

    #[test]
    fn settle_is_idempotent() {
        let mut loan = Loan::new();
        loan.settle();
        loan.settle();
    }

    #[test]
    fn settled_future_can_only_be_taken_once() {
        let mut loan = Loan::new();
        assert!(loan.take_settled().is_some());
        assert!(loan.take_settled().is_none());
    }
}
