//! Non-blocking lease locks with background renewal.

use crate::config::LeaseLockConfig;
use crate::entry::{LockEntry, LockListener, LockStatus};
use crate::error::LeaseResult;
use crate::registry::LockRegistry;
use crate::renewal::RenewalEngine;
use crate::store::LeaseStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Lease lock manager
///
/// Holders keep their leases alive from a background task; non-holders keep
/// retrying from the same task. Callers only ever read the locally cached
/// ownership through [`LeaseLock::try_lock`], which never touches the store.
///
/// Cloning is cheap and every clone shares the same locks.
#[derive(Clone)]
pub struct LeaseLock {
    inner: Arc<Inner>,
}

struct Inner {
    registry: LockRegistry,
    engine: RenewalEngine,
    /// Serializes registrations and renewal passes
    pass_lock: Mutex<()>,
    renewal_started: AtomicBool,
}

impl Inner {
    async fn renew_all(&self) {
        let _pass = self.pass_lock.lock().await;
        self.engine.run_pass(&self.registry.snapshot()).await;
    }
}

impl LeaseLock {
    /// Create a lock manager over `store`.
    ///
    /// Fails if `config` does not leave room for several renewals per lease.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use leasehold_lock::{LeaseLock, LeaseLockConfig};
    /// use leasehold_redis::{RedisConfig, RedisService};
    /// use std::sync::Arc;
    ///
    /// let redis = RedisService::new(RedisConfig::from_env().build()).await?;
    /// let leases = LeaseLock::new(Arc::new(redis), LeaseLockConfig::default())?;
    /// ```
    pub fn new(store: Arc<dyn LeaseStore>, config: LeaseLockConfig) -> LeaseResult<Self> {
        config.validate()?;

        info!(
            store = store.store_type(),
            renewal_interval = ?config.renewal_interval,
            lease_expiry = ?config.lease_expiry,
            "Creating lease lock manager"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                registry: LockRegistry::new(),
                engine: RenewalEngine::new(store, config),
                pass_lock: Mutex::new(()),
                renewal_started: AtomicBool::new(false),
            }),
        })
    }

    /// Create a lock manager with the default 2s interval / 20s lease.
    pub fn with_defaults(store: Arc<dyn LeaseStore>) -> LeaseResult<Self> {
        Self::new(store, LeaseLockConfig::default())
    }

    /// Get the lease timing.
    pub fn config(&self) -> &LeaseLockConfig {
        self.inner.engine.config()
    }

    /// Register a lock and make a first attempt to acquire it.
    ///
    /// `value` is the holder token written to the store, e.g. from
    /// [`holder_token`](crate::holder_token). The call waits for one renewal
    /// pass over every registered lock, so by the time it returns this process
    /// has tried to take the new lock. The first registration also starts the
    /// background renewal task on the current tokio runtime.
    ///
    /// Registering a key twice is rejected and leaves the first registration
    /// untouched. If the returned future is dropped before it completes, the
    /// lock stays registered and the background task keeps trying to take it.
    pub async fn register_lock(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        listener: Option<Arc<dyn LockListener>>,
    ) -> LeaseResult<()> {
        let _pass = self.inner.pass_lock.lock().await;

        let entry = match self.inner.registry.insert(LockEntry::new(key, value, listener)) {
            Ok(entry) => entry,
            Err(e) => {
                error!(error = %e, "Register lease lock failed");
                return Err(e);
            }
        };
        info!(key = %entry.key(), value = %entry.value(), "Registered lease lock");

        // Callers may drop this future mid-pass
        self.start_renewal();
        self.inner.engine.run_pass(&self.inner.registry.snapshot()).await;

        Ok(())
    }

    /// Whether this process currently holds `key`.
    ///
    /// Reads only local state. If the answer differs from the previous call,
    /// the lock's listener runs on this thread before returning.
    ///
    /// An unregistered key is a programming error and yields
    /// [`LeaseError::NotRegistered`](crate::LeaseError::NotRegistered).
    pub fn try_lock(&self, key: &str) -> LeaseResult<bool> {
        let entry = self.inner.registry.get(key)?;
        let held = entry.is_live_at(self.inner.engine.clock().now_millis());
        entry.observe(held);
        Ok(held)
    }

    /// Snapshot of a registered lock.
    ///
    /// `held` is the state last reported by [`LeaseLock::try_lock`].
    pub fn status(&self, key: &str) -> LeaseResult<LockStatus> {
        let entry = self.inner.registry.get(key)?;
        Ok(entry.status(self.inner.engine.clock().now_millis()))
    }

    /// Keys of every registered lock, sorted.
    pub fn registered_keys(&self) -> Vec<String> {
        self.inner.registry.keys()
    }

    /// Spawn the renewal loop if no earlier registration did.
    ///
    /// The loop holds a weak reference and ends once every handle is gone.
    fn start_renewal(&self) {
        if self.inner.renewal_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let interval = self.config().renewal_interval;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        info!(interval = ?interval, "Starting lease renewal task");

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let Some(inner) = weak.upgrade() else {
                    debug!("Lease lock manager dropped, stopping renewal task");
                    break;
                };
                inner.renew_all().await;
            }
        });
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.inner.registry.len()
    }
}
