//! Pool configuration

use std::time::Duration;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a [`Pool`](crate::Pool).
///
/// All fields have sensible defaults; construct with struct-update syntax:
///
/// ```
/// use std::time::Duration;
/// use reservoir::PoolConfig;
///
/// let config = PoolConfig {
///     max_size: 8,
///     min_size: 2,
///     acquire_timeout: Some(Duration::from_secs(5)),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Absolute ceiling on live resources plus in-flight creations.
    /// Values below 1 are clamped to 1.
    pub max_size: usize,
    /// Floor the pool replenishes to while started and not draining.
    /// Clamped to `[0, max_size]`.
    pub min_size: usize,
    /// Dispense order for the idle cache: `true` hands out the oldest idle
    /// resource first, `false` the most recently returned.
    pub fifo: bool,
    /// Number of priority slots in the waiter queue. Values below 1 are
    /// clamped to 1. Priority 0 is the highest.
    pub priority_range: usize,
    /// Cap on the number of queued acquire requests. When the cap is
    /// reached and no spare capacity or idle resource exists, `acquire`
    /// rejects immediately. `None` means unbounded.
    pub max_waiting_clients: Option<usize>,
    /// Per-request acquire timeout. `None` means wait forever.
    pub acquire_timeout: Option<Duration>,
    /// Timeout for a single factory `destroy` call. `None` means wait
    /// forever.
    pub destroy_timeout: Option<Duration>,
    /// Validate resources before dispatching them to a borrower.
    pub test_on_borrow: bool,
    /// Validate resources on return before re-entering the idle cache.
    pub test_on_return: bool,
    /// Interval between background eviction runs. `None` disables the
    /// evictor.
    pub eviction_run_interval: Option<Duration>,
    /// Maximum idle resources examined per eviction run.
    pub num_tests_per_eviction_run: usize,
    /// Soft idle threshold: evict resources idle longer than this, but only
    /// while more than `min_size` resources are idle. `None` disables.
    pub soft_idle_timeout: Option<Duration>,
    /// Hard idle threshold: evict resources idle longer than this
    /// regardless of `min_size`. `None` disables.
    pub idle_timeout: Option<Duration>,
    /// Start the pool (evictor scheduling, minimum replenishment) at
    /// construction. When `false`, call [`Pool::start`](crate::Pool::start)
    /// explicitly.
    pub autostart: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 1,
            min_size: 0,
            fifo: true,
            priority_range: 1,
            max_waiting_clients: None,
            acquire_timeout: None,
            destroy_timeout: None,
            test_on_borrow: false,
            test_on_return: false,
            eviction_run_interval: None,
            num_tests_per_eviction_run: 3,
            soft_idle_timeout: None,
            idle_timeout: Some(Duration::from_secs(30)),
            autostart: true,
        }
    }
}

impl PoolConfig {
    /// Validate the configuration, returning an error for values that
    /// cannot be fixed by clamping.
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.acquire_timeout {
            if timeout.is_zero() {
                return Err(Error::configuration(
                    "acquire_timeout must be greater than zero",
                ));
            }
        }
        if let Some(timeout) = self.destroy_timeout {
            if timeout.is_zero() {
                return Err(Error::configuration(
                    "destroy_timeout must be greater than zero",
                ));
            }
        }
        if self.eviction_run_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(Error::configuration(
                "eviction_run_interval must be greater than zero; use None to disable",
            ));
        }
        Ok(())
    }

    /// Clamp fields into their documented ranges: `max_size >= 1`,
    /// `min_size <= max_size`, `priority_range >= 1`.
    #[must_use]
    pub(crate) fn normalized(mut self) -> Self {
        self.max_size = self.max_size.max(1);
        self.min_size = self.min_size.min(self.max_size);
        self.priority_range = self.priority_range.max(1);
        self
    }
}
