//! Lease acquisition and renewal against the store.

use crate::config::LeaseLockConfig;
use crate::entry::LockEntry;
use crate::error::LeaseResult;
use crate::store::LeaseStore;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Monotonic milliseconds since the owning lock manager was created.
///
/// Uses the tokio clock so paused-time tests control it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LeaseClock {
    origin: Instant,
}

impl LeaseClock {
    pub(crate) fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub(crate) fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Runs renewal passes over registered entries.
pub(crate) struct RenewalEngine {
    store: Arc<dyn LeaseStore>,
    config: LeaseLockConfig,
    clock: LeaseClock,
}

impl RenewalEngine {
    pub(crate) fn new(store: Arc<dyn LeaseStore>, config: LeaseLockConfig) -> Self {
        Self {
            store,
            config,
            clock: LeaseClock::start(),
        }
    }

    pub(crate) fn config(&self) -> &LeaseLockConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> &LeaseClock {
        &self.clock
    }

    /// One pass over `entries`. A store failure only costs the entry it hit.
    pub(crate) async fn run_pass(&self, entries: &[Arc<LockEntry>]) {
        trace!(locks = entries.len(), "Starting lease renewal pass");

        for entry in entries {
            if let Err(e) = self.renew(entry).await {
                error!(
                    key = %entry.key(),
                    store = self.store.store_type(),
                    error = %e,
                    "Lease renewal step failed"
                );
            }
        }
    }

    async fn renew(&self, entry: &LockEntry) -> LeaseResult<()> {
        if entry.is_live_at(self.clock.now_millis()) {
            self.extend(entry).await
        } else {
            self.acquire(entry).await
        }
    }

    fn lease_millis(&self) -> u64 {
        self.config.lease_expiry_secs().saturating_mul(1000)
    }

    /// Local lease has lapsed: race for the key.
    async fn acquire(&self, entry: &LockEntry) -> LeaseResult<()> {
        let key = entry.key();

        // Read before the write so the local lease never outlives the store TTL
        let now = self.clock.now_millis();
        if self
            .store
            .set_if_absent(key, entry.value(), self.config.lease_expiry)
            .await?
        {
            entry.set_local_expiry(now.saturating_add(self.lease_millis()));
            info!(key = %key, value = %entry.value(), "Acquired lease lock");
            return Ok(());
        }

        // NX failed; the key may still be ours from an earlier lease
        let holder = self.store.get(key).await?;
        if holder.as_deref() != Some(entry.value()) {
            trace!(key = %key, holder = ?holder, "Lease lock held elsewhere");
            return Ok(());
        }

        let now = self.clock.now_millis();
        let ttl = self.store.ttl(key).await?;
        // Negative replies mean no key or no expiry
        let ttl_millis = u64::try_from(ttl).unwrap_or(0).saturating_mul(1000);
        if u128::from(ttl_millis) > self.config.renewal_interval.as_millis() {
            entry.set_local_expiry(now.saturating_add(ttl_millis));
            info!(key = %key, ttl = ttl, "Resynchronized lease lock already held by this node");
        } else {
            debug!(key = %key, ttl = ttl, "Own lease too close to expiry to adopt");
        }

        Ok(())
    }

    /// Local lease is running: confirm ownership, then push the TTL out.
    async fn extend(&self, entry: &LockEntry) -> LeaseResult<()> {
        let key = entry.key();

        let holder = self.store.get(key).await?;
        if holder.as_deref() != Some(entry.value()) {
            debug!(key = %key, holder = ?holder, "Lease lock no longer ours, skipping renewal");
            return Ok(());
        }

        let now = self.clock.now_millis();
        if self.store.expire(key, self.config.lease_expiry).await? {
            entry.set_local_expiry(now.saturating_add(self.lease_millis()));
            debug!(key = %key, "Renewed lease lock");
        } else {
            warn!(key = %key, "Lease renewal not acknowledged by store");
        }

        Ok(())
    }
}
