//! # Reservoir
//!
//! A generic resource pool for the Tokio ecosystem. Amortizes the cost of
//! creating expensive resources (database connections, sockets, parsers,
//! file handles) by holding a bounded set of them, lending them to callers
//! on demand, and reclaiming them on release.
//!
//! Implement [`Factory`] for your resource, build a [`Pool`], and call
//! [`Pool::acquire`]. A caller either gets an idle resource immediately,
//! triggers a new creation, or waits in a priority queue behind other
//! callers. Resources can be validated on borrow and on return, and a
//! background evictor retires resources that have been idle too long.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use reservoir::{Factory, Pool, PoolConfig, Result};
//!
//! struct Connector;
//!
//! #[async_trait]
//! impl Factory for Connector {
//!     type Resource = String;
//!
//!     async fn create(&self) -> Result<String> {
//!         Ok("connection".to_string())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pool = Pool::new(
//!         Connector,
//!         PoolConfig {
//!             max_size: 4,
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     let conn = pool.acquire().await?;
//!     assert_eq!(*conn, "connection");
//!     pool.release(conn).await?;
//!
//!     // Graceful shutdown: stop accepting work, wait for borrowers,
//!     // then destroy what is left.
//!     pool.drain().await;
//!     pool.clear().await;
//!     Ok(())
//! }
//! ```
//!
//! # Shutdown
//!
//! [`Pool::drain`] stops new acquires and waits for queued requests and
//! outstanding loans to settle; [`Pool::clear`] then destroys the idle
//! resources. While not draining, `clear` is followed by replenishment back
//! to `min_size`.
//!
//! # Observability
//!
//! Factory failures never surface to unrelated callers; they are published
//! on a broadcast channel instead, see [`Pool::subscribe`] and
//! [`PoolEvent`]. Counts are available through [`Pool::status`].

pub mod config;
pub mod error;
pub mod events;
pub mod factory;

mod checkout;
mod deferred;
mod evictor;
mod idle;
mod loan;
mod pool;
mod pooled;
mod queue;
mod request;

pub use checkout::Checkout;
pub use config::PoolConfig;
pub use error::{Error, Result};
pub use events::{EventBus, PoolEvent};
pub use factory::Factory;
pub use pool::{Pool, PoolStatus};
