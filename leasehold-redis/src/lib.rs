//! # Leasehold Redis
//!
//! Pooled Redis command execution for the lease lock engine.
//!
//! ## Features
//!
//! - **Connection Pooling**: bb8-managed multiplexed connections
//! - **Broken-Connection Disposal**: transport failures discard the connection
//!   instead of recycling it
//! - **Command Timeouts**: every command runs under a configurable deadline
//! - **Lease Primitives**: `SET NX EX`, `GET`, `TTL` and `EXPIRE`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leasehold_redis::{RedisConfig, RedisService};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .url("redis://localhost:6379")
//!         .pool_size(4)
//!         .build();
//!
//!     let redis = RedisService::new(config).await?;
//!
//!     if redis.set_nx_ex("jobs:leader", "node-a", Duration::from_secs(20)).await? {
//!         println!("acquired");
//!     }
//!
//!     // Arbitrary commands go through the same executor
//!     let size: i64 = redis.execute(&redis::cmd("DBSIZE")).await?;
//!     println!("{} keys", size);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pool;
mod service;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use error::{RedisError, Result};
pub use pool::{
    RedisConnection, RedisPool, RedisPoolBuilder, TrackedConnection, TrackedConnectionManager,
};
pub use service::{PoolStats, RedisService};

// Re-export redis crate for convenience
pub use redis;

/// Prelude for common imports.
///
/// ```
/// use leasehold_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisConfigBuilder};
    pub use crate::error::{RedisError, Result};
    pub use crate::pool::{RedisConnection, RedisPool, RedisPoolBuilder};
    pub use crate::service::{PoolStats, RedisService};
}
