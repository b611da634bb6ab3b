// Leasehold - non-blocking, self-renewing distributed lease locks
//
// This library re-exports the lease lock engine together with the pooled
// Redis executor it runs on.

// Re-export the lock engine
pub use leasehold_lock::*;

// Re-export the Redis executor as a module to keep its Result alias scoped
pub use leasehold_redis as redis;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        LeaseError,
        LeaseLock,
        LeaseLockConfig,
        LeaseResult,
        LeaseStore,
        LockEntry,
        LockListener,
        LockStatus,
        MemoryStore,
        holder_token,
    };
    pub use leasehold_redis::{RedisConfig, RedisService};
}
