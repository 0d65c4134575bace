//! Idle eviction policy.

use std::time::Instant;

use crate::config::PoolConfig;
use crate::pooled::PooledResource;

/// The slice of pool configuration the eviction policy consults.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EvictionCriteria {
    soft_idle_timeout: Option<std::time::Duration>,
    idle_timeout: Option<std::time::Duration>,
    min_size: usize,
}

impl EvictionCriteria {
    pub(crate) fn from_config(config: &PoolConfig) -> Self {
        Self {
            soft_idle_timeout: config.soft_idle_timeout,
            idle_timeout: config.idle_timeout,
            min_size: config.min_size,
        }
    }
}

/// Decide whether an idle resource should be destroyed.
///
/// Returns `true` when either threshold is exceeded:
/// - the soft threshold, but only while more than `min_size` resources are
///   idle (the floor is never drained by soft eviction);
/// - the hard threshold, unconditionally.
///
/// Only idle resources reach the evictor; a non-idle resource is never
/// evicted.
pub(crate) fn should_evict<T>(
    criteria: EvictionCriteria,
    pooled: &PooledResource<T>,
    available_count: usize,
    now: Instant,
) -> bool {
    let Some(idle_for) = pooled.idle_for(now) else {
        debug_assert!(false, "non-idle resource reached the evictor");
        return false;
    };
    if let Some(soft) = criteria.soft_idle_timeout {
        if idle_for > soft && available_count > criteria.min_size {
            return true;
        }
    }
    if let Some(hard) = criteria.idle_timeout {
        if idle_for > hard {
            return true;
        }
    }
    false
}
