//! Acquire timeout and waiter-queue cap tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reservoir::{Error, Factory, Pool, PoolConfig, Result};

struct TestFactory {
    created: Arc<AtomicU32>,
}

impl TestFactory {
    fn new() -> Self {
        Self {
            created: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl Factory for TestFactory {
    type Resource = String;

    async fn create(&self) -> Result<String> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("res-{n}"))
    }
}

// ---------------------------------------------------------------------------
// Acquire timeout
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn waiter_times_out_when_pool_stays_exhausted() {
    let config = PoolConfig {
        max_size: 1,
        acquire_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let pool = Pool::new(TestFactory::new(), config).unwrap();

    let held = pool.acquire().await.unwrap();

    let started = tokio::time::Instant::now();
    let err = pool.acquire().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
    assert!(err.is_retryable());
    assert!(
        elapsed >= Duration::from_millis(50),
        "rejected only at the deadline (after {elapsed:?})"
    );
    assert_eq!(pool.status().pending, 0, "timed-out waiter left the queue");

    pool.release(held).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn waiter_served_before_the_deadline_is_unaffected() {
    let config = PoolConfig {
        max_size: 1,
        acquire_timeout: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let pool = Pool::new(TestFactory::new(), config).unwrap();

    let held = pool.acquire().await.unwrap();

    let pool_clone = pool.clone();
    let waiter = tokio::spawn(async move { pool_clone.acquire().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    pool.release(held).await.unwrap();
    let checkout = waiter.await.unwrap().expect("served well within deadline");

    // Long after the original deadline nothing rejects retroactively.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(pool.is_borrowed(&checkout));
    pool.release(checkout).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn each_waiter_times_out_independently() {
    let config = PoolConfig {
        max_size: 1,
        acquire_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let pool = Pool::new(TestFactory::new(), config).unwrap();

    let _held = pool.acquire().await.unwrap();

    let first = tokio::spawn({
        let pool = pool.clone();
        async move { pool.acquire().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = tokio::spawn({
        let pool = pool.clone();
        async move { pool.acquire().await }
    });

    assert!(matches!(
        first.await.unwrap(),
        Err(Error::Timeout { .. })
    ));
    assert!(matches!(
        second.await.unwrap(),
        Err(Error::Timeout { .. })
    ));
    assert_eq!(pool.status().pending, 0);
}

// ---------------------------------------------------------------------------
// max_waiting_clients
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queue_cap_rejects_excess_waiters() {
    let config = PoolConfig {
        max_size: 1,
        max_waiting_clients: Some(2),
        ..Default::default()
    };
    let pool = Pool::new(TestFactory::new(), config).unwrap();

    let held = pool.acquire().await.unwrap();

    let mut waiters = Vec::new();
    for _ in 0..2 {
        let pool = pool.clone();
        waiters.push(tokio::spawn(async move { pool.acquire().await }));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.status().pending, 2);

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(
        err,
        Error::QueueFull {
            waiting: 2,
            max_waiting: 2
        }
    ));

    // Serve the queue so the spawned tasks finish cleanly.
    pool.release(held).await.unwrap();
    for waiter in waiters {
        let checkout = waiter.await.unwrap().unwrap();
        pool.release(checkout).await.unwrap();
    }
}

#[tokio::test]
async fn queue_cap_does_not_apply_while_capacity_or_idle_exists() {
    let config = PoolConfig {
        max_size: 1,
        max_waiting_clients: Some(0),
        ..Default::default()
    };
    let pool = Pool::new(TestFactory::new(), config).unwrap();

    // Spare capacity exists, so the zero-width queue cap is irrelevant.
    let first = pool.acquire().await.unwrap();
    pool.release(first).await.unwrap();

    // No spare capacity now, but an idle resource exists; still no
    // rejection.
    let second = pool.acquire().await.unwrap();
    pool.release(second).await.unwrap();
}
