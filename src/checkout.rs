//! Borrower-side handle for a pooled resource.

use crate::factory::Factory;
use crate::pool::Pool;

/// A borrowed resource.
///
/// Dereferences to the underlying resource. Return it explicitly with
/// [`Pool::release`] or [`Pool::destroy`]; a checkout dropped without
/// either is returned to the pool from a spawned task (so dropping one
/// requires a Tokio runtime context).
pub struct Checkout<M>
where
    M: Factory,
{
    id: u64,
    resource: Option<M::Resource>,
    pool: Option<Pool<M>>,
}

impl<M> Checkout<M>
where
    M: Factory,
{
    pub(crate) fn new(id: u64, resource: M::Resource, pool: Pool<M>) -> Self {
        Self {
            id,
            resource: Some(resource),
            pool: Some(pool),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn pool(&self) -> Option<&Pool<M>> {
        self.pool.as_ref()
    }

    /// Take the id and resource out, disarming the drop hook.
    pub(crate) fn disarm(&mut self) -> (u64, M::Resource) {
        self.pool = None;
        let resource = self
            .resource
            .take()
            .expect("checkout disarmed twice");
        (self.id, resource)
    }

    /// Remove the resource from pool management entirely.
    ///
    /// The pool gives the capacity slot back (and replenishes towards
    /// `min_size` if needed); the caller becomes responsible for the
    /// resource's teardown. The factory's `destroy` is not called.
    #[must_use]
    pub fn detach(mut self) -> M::Resource {
        let pool = self.pool.take();
        let resource = self
            .resource
            .take()
            .expect("checkout disarmed twice");
        if let Some(pool) = pool {
            pool.forget(self.id);
        }
        resource
    }
}

impl<M> std::ops::Deref for Checkout<M>
where
    M: Factory,
{
    type Target = M::Resource;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("checkout used after disarm")
    }
}

impl<M> std::ops::DerefMut for Checkout<M>
where
    M: Factory,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("checkout used after disarm")
    }
}

impl<M> Drop for Checkout<M>
where
    M: Factory,
{
    fn drop(&mut self) {
        if let (Some(resource), Some(pool)) = (self.resource.take(), self.pool.take()) {
            let id = self.id;
            // Return the resource from a task; Drop cannot await.
            drop(tokio::spawn(async move {
                let _ = pool.give_back(id, resource).await;
            }));
        }
    }
}

impl<M> std::fmt::Debug for Checkout<M>
where
    M: Factory,
    M::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .finish()
    }
}
