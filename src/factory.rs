//! The factory trait supplied by callers.

use async_trait::async_trait;

use crate::error::Result;

/// Creates, validates, and destroys the resources a pool manages.
///
/// The pool calls `create` to grow, `validate` when `test_on_borrow` or
/// `test_on_return` is enabled, and `destroy` when a resource is retired.
/// All three run outside the pool's internal lock, so implementations may
/// block on I/O freely.
///
/// ```
/// use async_trait::async_trait;
/// use reservoir::{Factory, Result};
///
/// struct Connector;
///
/// #[async_trait]
/// impl Factory for Connector {
///     type Resource = String;
///
///     async fn create(&self) -> Result<String> {
///         Ok("connection".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Factory: Send + Sync + 'static {
    /// The resource type produced by this factory.
    type Resource: Send + 'static;

    /// Produce a usable resource or fail.
    ///
    /// A failure is consumed by the engine: it is published as a
    /// [`PoolEvent::CreateError`](crate::PoolEvent::CreateError) and another
    /// creation attempt may follow. Waiters are never rejected by it.
    async fn create(&self) -> Result<Self::Resource>;

    /// Release the resource. Idempotency is not required; the pool calls
    /// this exactly once per resource.
    async fn destroy(&self, resource: Self::Resource) -> Result<()> {
        drop(resource);
        Ok(())
    }

    /// Check whether a resource is still usable.
    ///
    /// Only called when `test_on_borrow` or `test_on_return` is enabled.
    /// Returning `Ok(false)` or an error retires the resource.
    async fn validate(&self, resource: &Self::Resource) -> Result<bool> {
        let _ = resource;
        Ok(true)
    }
}
