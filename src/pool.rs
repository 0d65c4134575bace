//! The pool engine.
//!
//! Composes the waiter queue, idle cache, eviction policy, and factory
//! pipelines into the lifecycle engine. All bookkeeping lives in a single
//! [`EngineState`] behind one mutex; factory `create` / `validate` /
//! `destroy` calls run in spawned tasks whose completions re-enter the lock
//! and re-run dispensing, so the lock is never held across an await.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::checkout::Checkout;
use crate::config::PoolConfig;
use crate::deferred::{deferred, DeferredFuture};
use crate::error::{Error, Result};
use crate::events::{EventBus, PoolEvent};
use crate::evictor::{should_evict, EvictionCriteria};
use crate::factory::Factory;
use crate::idle::IdleQueue;
use crate::loan::Loan;
use crate::pooled::PooledResource;
use crate::queue::PriorityQueue;
use crate::request::ResourceRequest;

/// Payload delivered to a fulfilled acquire request: the pooled id plus the
/// resource value itself.
type Dispatch<T> = (u64, T);

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

/// Lifetime counters reported through [`PoolStatus`].
#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    created: u64,
    destroyed: u64,
    acquired: u64,
    released: u64,
}

/// All mutable engine bookkeeping, guarded by a single mutex.
struct EngineState<T> {
    waiters: PriorityQueue<ResourceRequest<Dispatch<T>>>,
    available: IdleQueue,
    all: HashMap<u64, PooledResource<T>>,
    loans: HashMap<u64, Loan>,
    creating: usize,
    destroying: usize,
    validating: usize,
    testing_on_borrow: usize,
    started: bool,
    draining: bool,
    evictor: Option<CancellationToken>,
    next_pooled_id: u64,
    next_request_id: u64,
    counters: Counters,
}

impl<T> EngineState<T> {
    fn new(priority_range: usize) -> Self {
        Self {
            waiters: PriorityQueue::new(priority_range),
            available: IdleQueue::new(),
            all: HashMap::new(),
            loans: HashMap::new(),
            creating: 0,
            destroying: 0,
            validating: 0,
            testing_on_borrow: 0,
            started: false,
            draining: false,
            evictor: None,
            next_pooled_id: 0,
            next_request_id: 0,
            counters: Counters::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// PoolStatus
// ---------------------------------------------------------------------------

/// Point-in-time introspection snapshot of a pool.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Live resources plus in-flight creations.
    pub size: usize,
    /// Idle resources ready to dispense.
    pub available: usize,
    /// Resources currently lent out.
    pub borrowed: usize,
    /// Acquire requests waiting in the queue.
    pub pending: usize,
    /// Capacity left before `max_size` is reached.
    pub spare_capacity: usize,
    /// The configured ceiling.
    pub max_size: usize,
    /// The configured floor.
    pub min_size: usize,
    /// Total resources ever created.
    pub created: u64,
    /// Total resources ever destroyed.
    pub destroyed: u64,
    /// Total successful acquisitions.
    pub acquired: u64,
    /// Total releases back to the pool.
    pub released: u64,
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

struct PoolInner<M: Factory> {
    manager: M,
    config: PoolConfig,
    state: Mutex<EngineState<M::Resource>>,
    events: EventBus,
    /// Bumped after every state mutation; `ready`, `drain`, and `clear`
    /// watch it instead of polling.
    changed: watch::Sender<u64>,
}

/// A generic resource pool.
///
/// Lends resources produced by a [`Factory`] to callers, reusing idle ones,
/// queueing callers by priority when capacity is exhausted, optionally
/// validating on borrow and return, and retiring resources that sit idle
/// too long.
///
/// Cloning is cheap and every clone drives the same pool.
pub struct Pool<M>
where
    M: Factory,
{
    inner: Arc<PoolInner<M>>,
}

impl<M: Factory> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Factory> std::fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("Pool").field("status", &status).finish()
    }
}

impl<M> Pool<M>
where
    M: Factory,
{
    /// Create a new pool.
    ///
    /// Out-of-range `max_size` / `min_size` / `priority_range` values are
    /// clamped into their documented ranges; zero timeouts are rejected.
    ///
    /// With `autostart` enabled (the default) this also [`start`]s the
    /// pool, which spawns background tasks; construct inside a Tokio
    /// runtime in that case.
    ///
    /// [`start`]: Pool::start
    pub fn new(manager: M, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let config = config.normalized();
        tracing::debug!(
            max_size = config.max_size,
            min_size = config.min_size,
            "creating resource pool"
        );
        let (changed, _) = watch::channel(0u64);
        let pool = Self {
            inner: Arc::new(PoolInner {
                manager,
                state: Mutex::new(EngineState::new(config.priority_range)),
                events: EventBus::default(),
                changed,
                config,
            }),
        };
        if pool.inner.config.autostart {
            pool.start();
        }
        Ok(pool)
    }

    // -- public contract ---------------------------------------------------

    /// Start the pool: schedule the evictor (if configured) and replenish
    /// towards `min_size`. Idempotent.
    pub fn start(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.started {
                return;
            }
            state.started = true;
            if let Some(interval) = self.inner.config.eviction_run_interval {
                let token = CancellationToken::new();
                state.evictor = Some(token.clone());
                self.spawn_evictor(interval, token);
            }
            self.ensure_minimum_locked(&mut state);
        }
        self.notify();
    }

    /// Acquire a resource at the default (highest) priority.
    pub async fn acquire(&self) -> Result<Checkout<M>> {
        self.acquire_with_priority(0).await
    }

    /// Acquire a resource, queueing at the given priority when the pool is
    /// busy. Priority 0 is served first; out-of-range priorities are
    /// clamped to the lowest slot.
    ///
    /// Fails immediately with [`Error::Draining`] while draining, and with
    /// [`Error::QueueFull`] when `max_waiting_clients` is reached with no
    /// spare capacity or idle resource.
    pub async fn acquire_with_priority(&self, priority: usize) -> Result<Checkout<M>> {
        let pending = {
            let mut state = self.inner.state.lock();
            if state.draining {
                return Err(Error::Draining);
            }
            if self.spare_capacity_locked(&state) < 1 && state.available.is_empty() {
                if let Some(max_waiting) = self.inner.config.max_waiting_clients {
                    if state.waiters.len() >= max_waiting {
                        return Err(Error::QueueFull {
                            waiting: state.waiters.len(),
                            max_waiting,
                        });
                    }
                }
            }
            let id = state.next_request_id;
            state.next_request_id += 1;
            let (tx, rx) = deferred();
            let mut request = ResourceRequest::new(id, tx);
            if let Some(delay) = self.inner.config.acquire_timeout {
                let deadline = request.deadline_for(delay);
                request.set_timer(self.spawn_request_timer(id, deadline, delay));
            }
            state.waiters.enqueue(request, priority);
            self.dispense_locked(&mut state);
            rx
        };
        self.notify();
        let (id, resource) = pending.await?;
        Ok(Checkout::new(id, resource, self.clone()))
    }

    /// Return a borrowed resource to the pool.
    ///
    /// With `test_on_return` enabled, this resolves only once the
    /// post-validation disposition is decided (re-idled or destroyed).
    pub async fn release(&self, checkout: Checkout<M>) -> Result<()> {
        if !self.owns(&checkout) {
            // Let the foreign checkout find its way home via its drop hook.
            return Err(Error::UnknownResource);
        }
        let mut checkout = checkout;
        let (id, resource) = checkout.disarm();
        self.give_back(id, resource).await
    }

    /// Return a borrowed resource and destroy it instead of re-idling.
    ///
    /// Resolves once the factory destroy completed (or timed out). A
    /// replacement is created if the pool falls below `min_size`.
    pub async fn destroy(&self, checkout: Checkout<M>) -> Result<()> {
        if !self.owns(&checkout) {
            return Err(Error::UnknownResource);
        }
        let mut checkout = checkout;
        let (id, resource) = checkout.disarm();
        let done = {
            let mut state = self.inner.state.lock();
            let Some(mut loan) = state.loans.remove(&id) else {
                return Err(Error::UnknownResource);
            };
            loan.settle();
            let done = self.begin_destroy_locked(&mut state, id, Some(resource));
            self.dispense_locked(&mut state);
            done
        };
        self.notify();
        let _ = done.await;
        Ok(())
    }

    /// Acquire a resource, run `operation` on it, then release on success
    /// or destroy on failure, propagating the operation's result.
    pub async fn use_with<U, F>(&self, operation: F) -> Result<U>
    where
        F: for<'c> FnOnce(&'c mut M::Resource) -> BoxFuture<'c, Result<U>>,
    {
        self.use_with_priority(operation, 0).await
    }

    /// [`use_with`](Pool::use_with) at an explicit queue priority.
    pub async fn use_with_priority<U, F>(&self, operation: F, priority: usize) -> Result<U>
    where
        F: for<'c> FnOnce(&'c mut M::Resource) -> BoxFuture<'c, Result<U>>,
    {
        let mut checkout = self.acquire_with_priority(priority).await?;
        let result = operation(&mut *checkout).await;
        match result {
            Ok(value) => {
                self.release(checkout).await?;
                Ok(value)
            }
            Err(error) => {
                let _ = self.destroy(checkout).await;
                Err(error)
            }
        }
    }

    /// Whether this checkout is an active loan of this pool.
    pub fn is_borrowed(&self, checkout: &Checkout<M>) -> bool {
        self.owns(checkout) && self.inner.state.lock().loans.contains_key(&checkout.id())
    }

    /// Resolve once at least `min_size` resources are idle.
    pub async fn ready(&self) {
        let min = self.inner.config.min_size;
        self.wait_until(|state| state.available.len() >= min).await;
    }

    /// Graceful shutdown, phase one: stop accepting acquires, de-schedule
    /// the evictor, wait for every queued request to settle, then wait for
    /// every outstanding loan to be returned.
    ///
    /// Existing waiters are still served by the normal dispensing path
    /// while they drain. Compose with [`clear`](Pool::clear) to also
    /// destroy the remaining idle resources.
    pub async fn drain(&self) {
        {
            let mut state = self.inner.state.lock();
            state.draining = true;
            if let Some(token) = state.evictor.take() {
                token.cancel();
            }
        }
        self.notify();
        tracing::debug!("pool draining");

        // Queued requests settle by being served, timing out, or having
        // been abandoned by their caller.
        let mut rx = self.inner.changed.subscribe();
        loop {
            let empty = {
                let mut state = self.inner.state.lock();
                while state
                    .waiters
                    .remove_where(ResourceRequest::is_abandoned)
                    .is_some()
                {}
                state.waiters.is_empty()
            };
            if empty {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }

        // Every loan extant now must settle; one failed borrower does not
        // short-circuit waiting on the rest.
        let settled: Vec<_> = {
            let mut state = self.inner.state.lock();
            state
                .loans
                .values_mut()
                .filter_map(Loan::take_settled)
                .collect()
        };
        for done in settled {
            let _ = done.await;
        }
        self.wait_until(|state| state.loans.is_empty()).await;
    }

    /// Destroy every idle resource.
    ///
    /// Waits for in-flight creations and validations to land first, then
    /// destroys everything in the idle cache and awaits all outstanding
    /// destroy operations. While not draining, the pool replenishes back
    /// towards `min_size` afterwards; while draining it never re-creates.
    pub async fn clear(&self) {
        self.wait_until(|state| state.creating == 0 && state.validating == 0)
            .await;
        let destroys = {
            let mut state = self.inner.state.lock();
            let mut destroys = Vec::new();
            while let Some(id) = state.available.pop_front() {
                destroys.push(self.begin_destroy_locked(&mut state, id, None));
            }
            destroys
        };
        self.notify();
        for done in destroys {
            let _ = done.await;
        }
        self.wait_until(|state| state.destroying == 0).await;
    }

    // -- introspection -----------------------------------------------------

    /// Snapshot the pool's counts.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock();
        let config = &self.inner.config;
        PoolStatus {
            size: state.all.len() + state.creating,
            available: state.available.len(),
            borrowed: state.loans.len(),
            pending: state.waiters.len(),
            spare_capacity: self.spare_capacity_locked(&state),
            max_size: config.max_size,
            min_size: config.min_size,
            created: state.counters.created,
            destroyed: state.counters.destroyed,
            acquired: state.counters.acquired,
            released: state.counters.released,
        }
    }

    /// Whether [`start`](Pool::start) has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.state.lock().started
    }

    /// Whether [`drain`](Pool::drain) has begun.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.inner.state.lock().draining
    }

    /// The pool's (normalized) configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Subscribe to factory failure events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.events.subscribe()
    }

    // -- internal: return paths --------------------------------------------

    /// Return a borrowed resource; shared by `release` and the checkout
    /// drop hook.
    pub(crate) async fn give_back(&self, id: u64, resource: M::Resource) -> Result<()> {
        let disposition = {
            let mut state = self.inner.state.lock();
            let Some(mut loan) = state.loans.remove(&id) else {
                return Err(Error::UnknownResource);
            };
            loan.settle();
            state.counters.released += 1;
            let pooled = state.all.get_mut(&id).expect("loaned resources stay tracked");
            pooled.returning();
            if self.inner.config.test_on_return {
                pooled.test();
                state.validating += 1;
                Some(self.spawn_return_validation(id, resource))
            } else {
                pooled.put_resource(resource);
                pooled.idle();
                self.reidle_locked(&mut state, id);
                self.dispense_locked(&mut state);
                None
            }
        };
        self.notify();
        if let Some(done) = disposition {
            let _ = done.await;
        }
        Ok(())
    }

    /// Remove a detached resource from pool management without destroying
    /// it; frees its capacity slot.
    pub(crate) fn forget(&self, id: u64) {
        {
            let mut state = self.inner.state.lock();
            if let Some(mut loan) = state.loans.remove(&id) {
                loan.settle();
            }
            if let Some(mut pooled) = state.all.remove(&id) {
                pooled.invalidate();
            }
            self.ensure_minimum_locked(&mut state);
            self.dispense_locked(&mut state);
        }
        self.notify();
    }

    // -- internal: dispensing ----------------------------------------------

    /// Match waiters to available or creatable resources. Invoked after
    /// every event that could unblock a waiter.
    fn dispense_locked(&self, state: &mut EngineState<M::Resource>) {
        let waiting = state.waiters.len();
        if waiting == 0 {
            return;
        }

        let potential = state.available.len() + state.testing_on_borrow + state.creating;
        let shortfall = waiting.saturating_sub(potential);
        let spare = self.spare_capacity_locked(state);
        // No dispense-driven growth while draining; only pre-drain
        // min-shortfall creations may still be in flight.
        let to_create = if state.draining { 0 } else { spare.min(shortfall) };
        for _ in 0..to_create {
            self.spawn_create_locked(state);
        }

        if self.inner.config.test_on_borrow {
            let need = waiting.saturating_sub(state.testing_on_borrow);
            let take = state.available.len().min(need);
            for _ in 0..take {
                let id = self.take_idle_locked(state).expect("length checked");
                let pooled = state.all.get_mut(&id).expect("available entries are tracked");
                pooled.test();
                let resource = pooled
                    .take_resource()
                    .expect("idle resources hold their value");
                state.testing_on_borrow += 1;
                state.validating += 1;
                self.spawn_borrow_validation(id, resource);
            }
        } else {
            let dispatch = state.available.len().min(waiting);
            for _ in 0..dispatch {
                let id = self.take_idle_locked(state).expect("length checked");
                self.dispatch_to_next_waiter_locked(state, id);
            }
        }
    }

    /// Hand an idle resource to the next pending waiter, or put it back at
    /// the head of the idle cache when nobody is waiting anymore.
    fn dispatch_to_next_waiter_locked(&self, state: &mut EngineState<M::Resource>, id: u64) {
        loop {
            let Some(request) = state.waiters.dequeue() else {
                self.requeue_first_locked(state, id);
                return;
            };
            if request.is_abandoned() {
                // Dropping the request aborts its timer.
                continue;
            }
            let pooled = state.all.get_mut(&id).expect("dispatching untracked resource");
            pooled.allocate();
            let resource = pooled
                .take_resource()
                .expect("idle resources hold their value");
            state.loans.insert(id, Loan::new());
            match request.resolve((id, resource)) {
                Ok(()) => {
                    state.counters.acquired += 1;
                    return;
                }
                Err((_, resource)) => {
                    // The caller went away between the abandonment check and
                    // delivery; undo and try the next waiter.
                    if let Some(mut loan) = state.loans.remove(&id) {
                        loan.settle();
                    }
                    let pooled = state.all.get_mut(&id).expect("still tracked");
                    pooled.put_resource(resource);
                    pooled.idle();
                }
            }
        }
    }

    /// Append a freshly idle resource to the cache. Dispense order decides
    /// which end `take_idle_locked` pops: the head for FIFO (oldest first),
    /// the tail for LIFO (most recently returned first).
    fn reidle_locked(&self, state: &mut EngineState<M::Resource>, id: u64) {
        state.available.push_back(id);
    }

    /// Pop the next idle resource to dispense.
    fn take_idle_locked(&self, state: &mut EngineState<M::Resource>) -> Option<u64> {
        if self.inner.config.fifo {
            state.available.pop_front()
        } else {
            state.available.pop_back()
        }
    }

    /// Put an undispatched resource back at the next-to-dispense position.
    fn requeue_first_locked(&self, state: &mut EngineState<M::Resource>, id: u64) {
        if self.inner.config.fifo {
            state.available.push_front(id);
        } else {
            state.available.push_back(id);
        }
    }

    // -- internal: factory pipelines ---------------------------------------

    /// Start one factory creation, tracked in `creating`.
    fn spawn_create_locked(&self, state: &mut EngineState<M::Resource>) {
        state.creating += 1;
        let pool = self.clone();
        drop(tokio::spawn(async move {
            let result = pool.inner.manager.create().await;
            let mut state = pool.inner.state.lock();
            state.creating -= 1;
            match result {
                Ok(resource) => {
                    let id = state.next_pooled_id;
                    state.next_pooled_id += 1;
                    state.all.insert(id, PooledResource::new(id, resource));
                    state.counters.created += 1;
                    pool.reidle_locked(&mut state, id);
                    tracing::debug!(id, "created resource");
                }
                Err(error) => {
                    // A failed creation does not consume a capacity slot and
                    // never rejects a waiter; another attempt may follow.
                    tracing::warn!(%error, "factory create failed");
                    pool.inner.events.emit(PoolEvent::CreateError {
                        error: error.to_string(),
                    });
                }
            }
            pool.dispense_locked(&mut state);
            drop(state);
            pool.notify();
        }));
    }

    /// Validate a resource pulled from the idle cache for a waiter.
    fn spawn_borrow_validation(&self, id: u64, resource: M::Resource) {
        let pool = self.clone();
        drop(tokio::spawn(async move {
            let valid = matches!(pool.inner.manager.validate(&resource).await, Ok(true));
            let mut state = pool.inner.state.lock();
            state.validating -= 1;
            state.testing_on_borrow -= 1;
            if valid {
                let pooled = state.all.get_mut(&id).expect("still tracked");
                pooled.put_resource(resource);
                pooled.idle();
                pool.dispatch_to_next_waiter_locked(&mut state, id);
            } else {
                tracing::debug!(id, "resource failed borrow validation");
                let _ = pool.begin_destroy_locked(&mut state, id, Some(resource));
                pool.dispense_locked(&mut state);
            }
            drop(state);
            pool.notify();
        }));
    }

    /// Validate a resource on its way back to the idle cache.
    fn spawn_return_validation(&self, id: u64, resource: M::Resource) -> DeferredFuture<()> {
        let (mut done, done_rx) = deferred();
        let pool = self.clone();
        drop(tokio::spawn(async move {
            let valid = matches!(pool.inner.manager.validate(&resource).await, Ok(true));
            let mut state = pool.inner.state.lock();
            state.validating -= 1;
            if valid {
                let pooled = state.all.get_mut(&id).expect("still tracked");
                pooled.put_resource(resource);
                pooled.idle();
                pool.reidle_locked(&mut state, id);
            } else {
                tracing::debug!(id, "resource failed return validation");
                let _ = pool.begin_destroy_locked(&mut state, id, Some(resource));
            }
            pool.dispense_locked(&mut state);
            drop(state);
            pool.notify();
            let _ = done.resolve(());
        }));
        done_rx
    }

    /// Retire a resource: invalidate it, drop it from the books, and run
    /// the factory destroy (raced against `destroy_timeout` when set).
    /// Ends with a `min_size` replenishment check.
    ///
    /// `resource` carries the value when the caller holds it (borrowed or
    /// mid-validation); for idle entries it is taken from the wrapper.
    fn begin_destroy_locked(
        &self,
        state: &mut EngineState<M::Resource>,
        id: u64,
        resource: Option<M::Resource>,
    ) -> DeferredFuture<()> {
        let (mut done, done_rx) = deferred();
        let mut pooled = state
            .all
            .remove(&id)
            .expect("destroying untracked resource");
        pooled.invalidate();
        let resource = resource.or_else(|| pooled.take_resource());
        debug_assert!(resource.is_some(), "destroying a resource without its value");
        state.destroying += 1;
        tracing::debug!(id, "destroying resource");
        let pool = self.clone();
        drop(tokio::spawn(async move {
            if let Some(resource) = resource {
                pool.run_destroy(resource).await;
            }
            let mut state = pool.inner.state.lock();
            state.destroying -= 1;
            state.counters.destroyed += 1;
            pool.ensure_minimum_locked(&mut state);
            pool.dispense_locked(&mut state);
            drop(state);
            pool.notify();
            let _ = done.resolve(());
        }));
        done_rx
    }

    /// Run the factory destroy, racing it against `destroy_timeout` when
    /// configured. Failures are consumed and re-published as events.
    async fn run_destroy(&self, resource: M::Resource) {
        let destroy = self.inner.manager.destroy(resource);
        let result = match self.inner.config.destroy_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, destroy).await {
                Ok(result) => result,
                Err(_) => Err(Error::DestroyTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            },
            None => destroy.await,
        };
        if let Err(error) = result {
            tracing::warn!(%error, "factory destroy failed");
            self.inner.events.emit(PoolEvent::DestroyError {
                error: error.to_string(),
            });
        }
    }

    /// Replenish towards `min_size` while started and not draining.
    fn ensure_minimum_locked(&self, state: &mut EngineState<M::Resource>) {
        if !state.started || state.draining {
            return;
        }
        let current = state.all.len() + state.creating;
        for _ in current..self.inner.config.min_size {
            self.spawn_create_locked(state);
        }
    }

    // -- internal: timers and eviction -------------------------------------

    /// Timer that rejects request `id` with `Error::Timeout` if it is
    /// still queued at the deadline.
    fn spawn_request_timer(&self, id: u64, deadline: Instant, delay: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            let Some(inner) = weak.upgrade() else { return };
            let pool = Pool { inner };
            let rejected = {
                let mut state = pool.inner.state.lock();
                match state.waiters.remove_where(|request| request.id() == id) {
                    Some(request) => request.reject(Error::Timeout {
                        timeout_ms: delay.as_millis() as u64,
                    }),
                    None => false,
                }
            };
            if rejected {
                tracing::debug!(request = id, "acquire timed out");
                pool.notify();
            }
        })
    }

    fn spawn_evictor(&self, interval: Duration, token: CancellationToken) {
        let weak = Arc::downgrade(&self.inner);
        drop(tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    () = token.cancelled() => break,
                }
                let Some(inner) = weak.upgrade() else { break };
                let pool = Pool { inner };
                pool.run_eviction();
            }
        }));
    }

    /// One eviction run: advance the persistent cursor up to
    /// `num_tests_per_eviction_run` steps, destroying entries the policy
    /// condemns. The cursor survives removals and wraps at the tail.
    fn run_eviction(&self) {
        let criteria = EvictionCriteria::from_config(&self.inner.config);
        let now = Instant::now();
        let mut evicted = 0usize;
        {
            let mut state = self.inner.state.lock();
            if state.draining {
                return;
            }
            for _ in 0..self.inner.config.num_tests_per_eviction_run {
                let Some(id) = state.available.cursor_next() else {
                    break;
                };
                let available_count = state.available.len();
                let condemned = {
                    let pooled = state.all.get(&id).expect("available entries are tracked");
                    should_evict(criteria, pooled, available_count, now)
                };
                if condemned {
                    state.available.remove(id);
                    let _ = self.begin_destroy_locked(&mut state, id, None);
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            tracing::debug!(evicted, "eviction run retired idle resources");
            self.notify();
        }
    }

    // -- internal: plumbing ------------------------------------------------

    fn spare_capacity_locked(&self, state: &EngineState<M::Resource>) -> usize {
        self.inner
            .config
            .max_size
            .saturating_sub(state.all.len() + state.creating)
    }

    fn owns(&self, checkout: &Checkout<M>) -> bool {
        checkout
            .pool()
            .is_some_and(|pool| Arc::ptr_eq(&pool.inner, &self.inner))
    }

    fn notify(&self) {
        self.inner
            .changed
            .send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Park until the predicate holds, re-checking after every state
    /// change.
    async fn wait_until<F>(&self, predicate: F)
    where
        F: Fn(&EngineState<M::Resource>) -> bool,
    {
        let mut rx = self.inner.changed.subscribe();
        loop {
            {
                let state = self.inner.state.lock();
                if predicate(&state) {
                    return;
                }
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
