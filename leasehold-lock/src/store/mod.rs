//! Lease storage backends
//!
//! The renewal engine only needs four atomic primitives from its store:
//!
//! - **Memory**: in-process store (tests, single-instance deployments)
//! - **Redis**: pooled Redis via `leasehold-redis`

mod memory;
mod redis;

pub use memory::MemoryStore;

use crate::error::LeaseResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// `TTL` reply for a key that does not exist.
pub const TTL_MISSING: i64 = -2;

/// `TTL` reply for a key without an expiry.
pub const TTL_PERSISTENT: i64 = -1;

/// Trait for lease storage backends
///
/// Every method is one atomic store operation. Implementations must report
/// connectivity problems as errors, never as a `false`/`None` outcome.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Set `key = value` with the given TTL only if `key` is absent.
    /// Returns `false` when the key already exists.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> LeaseResult<bool>;

    /// Current value of `key`, if any.
    async fn get(&self, key: &str) -> LeaseResult<Option<String>>;

    /// Remaining TTL of `key` in seconds ([`TTL_MISSING`] / [`TTL_PERSISTENT`]
    /// for the special cases).
    async fn ttl(&self, key: &str) -> LeaseResult<i64>;

    /// Reset the TTL of `key`. Returns `false` when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> LeaseResult<bool>;

    /// Backend name, for logs
    fn store_type(&self) -> &'static str;
}

#[async_trait]
impl<S: LeaseStore + ?Sized> LeaseStore for Arc<S> {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> LeaseResult<bool> {
        (**self).set_if_absent(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> LeaseResult<Option<String>> {
        (**self).get(key).await
    }

    async fn ttl(&self, key: &str) -> LeaseResult<i64> {
        (**self).ttl(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> LeaseResult<bool> {
        (**self).expire(key, ttl).await
    }

    fn store_type(&self) -> &'static str {
        (**self).store_type()
    }
}
