//! Lease Lock Sample
//!
//! Registers two lease locks against Redis and reports which ones this
//! process holds. Run several copies side by side: every lock is held by
//! exactly one of them, and a lock moves to another copy about one lease
//! after its holder is stopped.
//!
//! Note: This example requires Redis to be running
//! Start Redis: docker run -p 6379:6379 redis

use leasehold::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const LOCK1: &str = "leasehold:sample:lock1";
const LOCK2: &str = "leasehold:sample:lock2";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Done once at startup
    let redis = RedisService::new(RedisConfig::from_env().build()).await?;
    let leases = LeaseLock::new(Arc::new(redis), LeaseLockConfig::from_env().build()?)?;

    let node = holder_token();
    tracing::info!(node = %node, "Starting lease lock sample");

    let listener: Arc<dyn LockListener> = Arc::new(|entry: &LockEntry, held: bool, changes: u64| {
        tracing::info!(key = %entry.key(), held, changes, "Lease ownership changed");
    });

    leases
        .register_lock(LOCK1, node.as_str(), Some(listener.clone()))
        .await?;
    leases.register_lock(LOCK2, node.as_str(), Some(listener)).await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if leases.try_lock(LOCK1)? {
                    tracing::info!("Holding {}, doing work 1", LOCK1);
                }
                if leases.try_lock(LOCK2)? {
                    tracing::info!("Holding {}, doing work 2", LOCK2);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
