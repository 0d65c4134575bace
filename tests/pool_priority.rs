//! Waiter ordering tests: priority slots and FIFO within a slot.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reservoir::{Checkout, Factory, Pool, PoolConfig, Result};

struct TestFactory;

#[async_trait]
impl Factory for TestFactory {
    type Resource = String;

    async fn create(&self) -> Result<String> {
        Ok("res".to_string())
    }
}

/// Spawn an acquire at `priority` that records its resolution rank.
fn spawn_ranked_acquire(
    pool: &Pool<TestFactory>,
    priority: usize,
    rank: Arc<AtomicU32>,
) -> tokio::task::JoinHandle<(u32, Checkout<TestFactory>)> {
    let pool = pool.clone();
    tokio::spawn(async move {
        let checkout = pool.acquire_with_priority(priority).await.unwrap();
        (rank.fetch_add(1, Ordering::SeqCst), checkout)
    })
}

#[tokio::test(start_paused = true)]
async fn higher_priority_waiters_resolve_first() {
    let config = PoolConfig {
        max_size: 1,
        priority_range: 3,
        ..Default::default()
    };
    let pool = Pool::new(TestFactory, config).unwrap();
    let held = pool.acquire().await.unwrap();

    let rank = Arc::new(AtomicU32::new(0));
    // Enqueue: a at the lowest priority, b at the highest, c in between.
    let a = spawn_ranked_acquire(&pool, 2, Arc::clone(&rank));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let b = spawn_ranked_acquire(&pool, 0, Arc::clone(&rank));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let c = spawn_ranked_acquire(&pool, 1, Arc::clone(&rank));
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(pool.status().pending, 3);

    // One resource cycles through all three waiters.
    pool.release(held).await.unwrap();
    let (rank_b, checkout) = b.await.unwrap();
    pool.release(checkout).await.unwrap();
    let (rank_c, checkout) = c.await.unwrap();
    pool.release(checkout).await.unwrap();
    let (rank_a, checkout) = a.await.unwrap();
    pool.release(checkout).await.unwrap();

    assert_eq!((rank_b, rank_c, rank_a), (0, 1, 2), "order is b, c, a");
}

#[tokio::test(start_paused = true)]
async fn same_priority_is_served_fifo() {
    let config = PoolConfig {
        max_size: 1,
        priority_range: 2,
        ..Default::default()
    };
    let pool = Pool::new(TestFactory, config).unwrap();
    let held = pool.acquire().await.unwrap();

    let rank = Arc::new(AtomicU32::new(0));
    let mut waiters = Vec::new();
    for _ in 0..3 {
        waiters.push(spawn_ranked_acquire(&pool, 1, Arc::clone(&rank)));
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    pool.release(held).await.unwrap();
    let mut ranks = Vec::new();
    for waiter in waiters {
        let (rank, checkout) = waiter.await.unwrap();
        ranks.push(rank);
        pool.release(checkout).await.unwrap();
    }
    assert_eq!(ranks, vec![0, 1, 2], "enqueue order is resolution order");
}

#[tokio::test(start_paused = true)]
async fn out_of_range_priority_is_clamped_to_lowest() {
    let config = PoolConfig {
        max_size: 1,
        priority_range: 2,
        ..Default::default()
    };
    let pool = Pool::new(TestFactory, config).unwrap();
    let held = pool.acquire().await.unwrap();

    let rank = Arc::new(AtomicU32::new(0));
    // Priority 99 is clamped to 1, so the later priority-0 waiter wins.
    let clamped = spawn_ranked_acquire(&pool, 99, Arc::clone(&rank));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let urgent = spawn_ranked_acquire(&pool, 0, Arc::clone(&rank));
    tokio::time::sleep(Duration::from_millis(1)).await;

    pool.release(held).await.unwrap();
    let (urgent_rank, checkout) = urgent.await.unwrap();
    pool.release(checkout).await.unwrap();
    let (clamped_rank, checkout) = clamped.await.unwrap();
    pool.release(checkout).await.unwrap();

    assert!(urgent_rank < clamped_rank);
}
