//! Integration tests for common Leasehold workflows.
//!
//! Several lock managers share one store, the way several processes share one
//! Redis.

use leasehold::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn config() -> LeaseLockConfig {
    LeaseLockConfig::builder()
        .renewal_interval(Duration::from_secs(1))
        .lease_expiry(Duration::from_secs(10))
        .build()
        .unwrap()
}

// =============================================================================
// Multiple Locks, Multiple Nodes
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_two_nodes_two_locks() {
    let store = Arc::new(MemoryStore::new());
    let node_a = LeaseLock::new(store.clone(), config()).unwrap();
    let node_b = LeaseLock::new(store.clone(), config()).unwrap();

    node_a.register_lock("lock1", "node-a", None).await.unwrap();
    node_b.register_lock("lock1", "node-b", None).await.unwrap();
    node_b.register_lock("lock2", "node-b", None).await.unwrap();
    node_a.register_lock("lock2", "node-a", None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_500)).await;

    // First registrant wins each lock and keeps it
    assert!(node_a.try_lock("lock1").unwrap());
    assert!(!node_b.try_lock("lock1").unwrap());
    assert!(node_b.try_lock("lock2").unwrap());
    assert!(!node_a.try_lock("lock2").unwrap());

    assert_eq!(store.value("lock1").as_deref(), Some("node-a"));
    assert_eq!(store.value("lock2").as_deref(), Some("node-b"));
}

#[tokio::test(start_paused = true)]
async fn test_failover_after_holder_stops() {
    let store = Arc::new(MemoryStore::new());
    let node_a = LeaseLock::new(store.clone(), config()).unwrap();
    let node_b = LeaseLock::new(store.clone(), config()).unwrap();

    node_a.register_lock("lock1", "node-a", None).await.unwrap();
    node_b.register_lock("lock1", "node-b", None).await.unwrap();
    assert!(node_a.try_lock("lock1").unwrap());

    // Dropping the last handle stops node_a's renewals at its next tick
    drop(node_a);

    tokio::time::sleep(Duration::from_millis(9_500)).await;
    assert!(!node_b.try_lock("lock1").unwrap());

    // The key set at t=0 expires at t=10 and node_b takes it on that pass
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(node_b.try_lock("lock1").unwrap());
    assert_eq!(store.value("lock1").as_deref(), Some("node-b"));
}

#[tokio::test(start_paused = true)]
async fn test_restarted_node_reclaims_its_own_lease() {
    let store = Arc::new(MemoryStore::new());

    let first = LeaseLock::new(store.clone(), config()).unwrap();
    first.register_lock("lock1", "node-a", None).await.unwrap();
    drop(first);

    // Same token, fresh process state: NX fails but the value is ours
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let second = LeaseLock::new(store.clone(), config()).unwrap();
    second.register_lock("lock1", "node-a", None).await.unwrap();

    assert!(second.try_lock("lock1").unwrap());
    let status = second.status("lock1").unwrap();
    assert_eq!(status.lease_remaining, Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn test_listener_sees_gain_and_loss() {
    use support::Recorder;

    let store = Arc::new(MemoryStore::new());
    let leases = LeaseLock::new(store.clone(), config()).unwrap();
    let recorder = Recorder::default();

    leases
        .register_lock("lock1", "node-a", Some(recorder.listener()))
        .await
        .unwrap();
    assert!(leases.try_lock("lock1").unwrap());

    // Someone else overwrites the key; renewals stop and the lease runs out
    store.insert("lock1", "node-z", Some(Duration::from_secs(120)));
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert!(!leases.try_lock("lock1").unwrap());

    assert_eq!(recorder.events(), vec![(true, 1), (false, 2)]);
}

mod support {
    use leasehold::prelude::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    pub struct Recorder {
        events: Arc<Mutex<Vec<(bool, u64)>>>,
    }

    impl Recorder {
        pub fn listener(&self) -> Arc<dyn LockListener> {
            let events = self.events.clone();
            Arc::new(move |_: &LockEntry, held: bool, count: u64| {
                events.lock().unwrap().push((held, count));
            })
        }

        pub fn events(&self) -> Vec<(bool, u64)> {
            self.events.lock().unwrap().clone()
        }
    }
}
