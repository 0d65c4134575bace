//! Internal wrapper around a live resource.

use std::time::{Duration, Instant};

/// Lifecycle state of a pooled resource.
///
/// Transitions:
/// - `Idle -> Allocated` on dispatch
/// - `Idle -> Validation` on a borrow test
/// - `Allocated -> Returning` on release
/// - `Returning -> Validation` on a return test
/// - `Returning -> Idle` when no return test is configured
/// - `Validation -> Idle` when the validator passes
/// - any state `-> Invalid` when the resource is retired
///
/// `Invalid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceState {
    Idle,
    Allocated,
    Validation,
    Returning,
    Invalid,
}

/// The engine's wrapper around a live resource.
///
/// Owns the resource value whenever it is not lent out or being validated
/// or destroyed, and carries the lifecycle state plus timing metadata the
/// evictor consults. `last_idle` is `Some` exactly while the state is
/// `Idle`.
pub(crate) struct PooledResource<T> {
    id: u64,
    resource: Option<T>,
    state: ResourceState,
    created_at: Instant,
    last_borrowed: Instant,
    last_returned: Instant,
    last_idle: Option<Instant>,
}

impl<T> PooledResource<T> {
    /// Wrap a freshly created resource. Starts out `Idle`.
    pub(crate) fn new(id: u64, resource: T) -> Self {
        let now = Instant::now();
        Self {
            id,
            resource: Some(resource),
            state: ResourceState::Idle,
            created_at: now,
            last_borrowed: now,
            last_returned: now,
            last_idle: Some(now),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> ResourceState {
        self.state
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    pub(crate) fn last_borrowed(&self) -> Instant {
        self.last_borrowed
    }

    pub(crate) fn last_returned(&self) -> Instant {
        self.last_returned
    }

    /// How long the resource has been idle, or `None` when not idle.
    pub(crate) fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.last_idle.map(|since| now.saturating_duration_since(since))
    }

    /// Move the resource value out, leaving the wrapper as bookkeeping
    /// only. Used when lending to a borrower or handing the value to a
    /// factory task.
    pub(crate) fn take_resource(&mut self) -> Option<T> {
        self.resource.take()
    }

    /// Put the resource value back after a validation round or a return.
    pub(crate) fn put_resource(&mut self, resource: T) {
        debug_assert!(self.resource.is_none(), "resource slot already occupied");
        self.resource = Some(resource);
    }

    /// `Idle -> Allocated`, on dispatch to a waiter.
    pub(crate) fn allocate(&mut self) {
        debug_assert_eq!(self.state, ResourceState::Idle);
        self.state = ResourceState::Allocated;
        self.last_borrowed = Instant::now();
        self.last_idle = None;
    }

    /// `Idle | Returning -> Validation`, before a factory validate call.
    pub(crate) fn test(&mut self) {
        debug_assert!(matches!(
            self.state,
            ResourceState::Idle | ResourceState::Returning
        ));
        self.state = ResourceState::Validation;
        self.last_idle = None;
    }

    /// `Allocated -> Returning`, on release.
    pub(crate) fn returning(&mut self) {
        debug_assert_eq!(self.state, ResourceState::Allocated);
        self.state = ResourceState::Returning;
        self.last_returned = Instant::now();
    }

    /// `Allocated | Returning | Validation -> Idle`.
    pub(crate) fn idle(&mut self) {
        debug_assert!(matches!(
            self.state,
            ResourceState::Allocated | ResourceState::Returning | ResourceState::Validation
        ));
        self.state = ResourceState::Idle;
        self.last_idle = Some(Instant::now());
    }

    /// Any state `-> Invalid`. Terminal.
    pub(crate) fn invalidate(&mut self) {
        self.state = ResourceState::Invalid;
        self.last_idle = None;
    }
}

impl<T> std::fmt::Debug for PooledResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledResource")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("lent", &self.resource.is_none())
            .finish()
    }
}
