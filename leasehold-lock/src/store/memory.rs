//! In-memory lease store
//!
//! A single mutex over the key map makes every primitive linearizable, which
//! is what the lease algorithm assumes of a real store. Expiry is measured on
//! the tokio clock so paused-time tests can drive it.

use crate::error::LeaseResult;
use crate::store::{LeaseStore, TTL_MISSING, TTL_PERSISTENT};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-memory lease store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally write `key`, optionally with a TTL
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let now = Instant::now();
        self.entries.lock().insert(
            key.into(),
            StoredValue {
                value: value.into(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
    }

    /// Delete `key`; returns whether a live value was removed
    pub fn remove(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .remove(key)
            .is_some_and(|stored| !stored.is_expired(now))
    }

    /// Current live value of `key`
    pub fn value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.value.clone())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|stored| !stored.is_expired(now))
            .count()
    }

    /// Whether no live keys remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a live entry, evicting it first if its TTL has passed
    fn live<'a>(
        entries: &'a mut HashMap<String, StoredValue>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut StoredValue> {
        if entries.get(key).is_some_and(|stored| stored.is_expired(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> LeaseResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if Self::live(&mut entries, key, now).is_some() {
            trace!(key = %key, "SET NX rejected, key exists");
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: Some(now + Duration::from_secs(ttl.as_secs())),
            },
        );
        trace!(key = %key, value = %value, "SET NX accepted");
        Ok(true)
    }

    async fn get(&self, key: &str) -> LeaseResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Ok(Self::live(&mut entries, key, now).map(|stored| stored.value.clone()))
    }

    async fn ttl(&self, key: &str) -> LeaseResult<i64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let ttl = match Self::live(&mut entries, key, now) {
            None => TTL_MISSING,
            Some(StoredValue {
                expires_at: None, ..
            }) => TTL_PERSISTENT,
            // Redis rounds the millisecond remainder to the nearest second
            Some(StoredValue {
                expires_at: Some(deadline),
                ..
            }) => ((deadline.duration_since(now).as_millis() + 500) / 1000) as i64,
        };
        Ok(ttl)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> LeaseResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match Self::live(&mut entries, key, now) {
            Some(stored) => {
                stored.expires_at = Some(now + Duration::from_secs(ttl.as_secs()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
