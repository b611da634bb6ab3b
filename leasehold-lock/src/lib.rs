//! Self-renewing distributed lease locks
//!
//! Several processes race for a named lock stored in a shared key-value store
//! (`SET key value NX EX ttl`). The winner keeps its lease alive from a
//! background task; the others keep retrying from theirs. Application code
//! never waits on the store: it asks [`LeaseLock::try_lock`], which answers
//! from local state.
//!
//! ## Features
//!
//! - **Non-blocking ownership checks** - `try_lock` does no I/O
//! - **Background renewal** - one task per manager renews or re-acquires every lock
//! - **Change notification** - per-lock listeners fire on every ownership flip
//! - **Pluggable stores** - Redis (pooled) and in-memory backends
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leasehold_lock::*;
//! use leasehold_redis::{RedisConfig, RedisService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let redis = RedisService::new(RedisConfig::from_env().build()).await?;
//!     let leases = LeaseLock::new(Arc::new(redis), LeaseLockConfig::default())?;
//!
//!     let node = holder_token();
//!     leases.register_lock("billing-sweeper", node.as_str(), None).await?;
//!
//!     if leases.try_lock("billing-sweeper")? {
//!         println!("this node runs the sweeper");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! Ownership is a best-effort local view, stale by at most one renewal
//! interval. Work started while holding a lease may still be running after the
//! lease moves elsewhere; callers must tolerate that.

pub mod config;
pub mod entry;
pub mod error;
pub mod lease;
pub mod store;

mod registry;
mod renewal;

pub use config::{LeaseLockConfig, LeaseLockConfigBuilder};
pub use entry::{LockEntry, LockListener, LockStatus};
pub use error::{LeaseError, LeaseResult};
pub use lease::LeaseLock;
pub use store::{LeaseStore, MemoryStore};

/// A holder token unique to this process: `<pid>-<uuid>`.
pub fn holder_token() -> String {
    format!("{}-{}", std::process::id(), uuid::Uuid::new_v4())
}
