//! Per-lock state shared between the renewal engine and callers.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Callback fired when [`LeaseLock::try_lock`](crate::LeaseLock::try_lock)
/// observes an ownership change.
///
/// Runs synchronously on the thread that called `try_lock`, once per
/// transition. `change_count` starts at 1 for the first transition.
pub trait LockListener: Send + Sync {
    /// Called with the entry, the new ownership state and the transition count.
    fn lock_changed(&self, entry: &LockEntry, held: bool, change_count: u64);
}

impl<F> LockListener for F
where
    F: Fn(&LockEntry, bool, u64) + Send + Sync,
{
    fn lock_changed(&self, entry: &LockEntry, held: bool, change_count: u64) {
        self(entry, held, change_count)
    }
}

/// One registered lock.
///
/// `local_expiry` is written only by the renewal engine. While this process
/// holds the lock it tracks the store-side expiry; otherwise it keeps the
/// expiry of the last lease this process held. It is stored as milliseconds
/// since the owning [`LeaseLock`](crate::LeaseLock) was created, so `0` means
/// "already expired".
pub struct LockEntry {
    key: String,
    value: String,
    local_expiry: AtomicU64,
    held: AtomicBool,
    change_count: AtomicU64,
    listener: Option<Arc<dyn LockListener>>,
}

impl LockEntry {
    pub(crate) fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        listener: Option<Arc<dyn LockListener>>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            local_expiry: AtomicU64::new(0),
            held: AtomicBool::new(false),
            change_count: AtomicU64::new(0),
            listener,
        }
    }

    /// The store key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The holder token this process writes
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Last ownership state reported by `try_lock`
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Number of ownership transitions observed so far
    pub fn change_count(&self) -> u64 {
        self.change_count.load(Ordering::Acquire)
    }

    pub(crate) fn local_expiry(&self) -> u64 {
        self.local_expiry.load(Ordering::Acquire)
    }

    pub(crate) fn set_local_expiry(&self, millis: u64) {
        self.local_expiry.store(millis, Ordering::Release);
    }

    /// Whether the local lease is still running at `now_millis`
    pub(crate) fn is_live_at(&self, now_millis: u64) -> bool {
        now_millis < self.local_expiry()
    }

    /// Publish `held`; fires the listener if this flips the previous state.
    pub(crate) fn observe(&self, held: bool) -> bool {
        if self.held.swap(held, Ordering::AcqRel) == held {
            return false;
        }

        let count = self.change_count.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(listener) = &self.listener {
            listener.lock_changed(self, held, count);
        }
        true
    }

    pub(crate) fn status(&self, now_millis: u64) -> LockStatus {
        let expiry = self.local_expiry();
        LockStatus {
            key: self.key.clone(),
            value: self.value.clone(),
            held: self.is_held(),
            change_count: self.change_count(),
            lease_remaining: Duration::from_millis(expiry.saturating_sub(now_millis)),
        }
    }
}

impl fmt::Debug for LockEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("local_expiry", &self.local_expiry())
            .field("held", &self.is_held())
            .field("change_count", &self.change_count())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// Point-in-time view of a registered lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    /// The store key
    pub key: String,
    /// The holder token this process writes
    pub value: String,
    /// Last ownership state reported by `try_lock`
    pub held: bool,
    /// Ownership transitions observed so far
    pub change_count: u64,
    /// Time left on the local lease (zero when lapsed)
    #[serde(serialize_with = "serialize_millis")]
    pub lease_remaining: Duration,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
