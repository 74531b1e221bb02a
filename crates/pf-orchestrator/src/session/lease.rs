//! Per-host run serialisation
//!
//! The session registry is keyed by host address, so two installations
//! against the same address would displace each other's session. Each run
//! holds a [`HostLease`] for its address for its whole duration; a second run
//! for the same address waits until the first releases it. Runs against
//! different addresses never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Per-host mutexes. An address's entry lives only while a run holds or
/// waits for it.
#[derive(Default)]
pub struct HostLeases {
    locks: Arc<LockMap>,
}

/// Exclusive right to operate on one host; released on drop
pub struct HostLease {
    host: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl HostLease {
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Drop for HostLease {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone of the mutex, so the entry stays
        // until the last of them is done
        self.locks
            .remove_if(&self.host, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl HostLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `host`
    pub async fn acquire(&self, host: &str) -> HostLease {
        let lock = Arc::clone(
            self.locks
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = lock.lock_owned().await;
        HostLease {
            host: host.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Whether a run currently holds `host`
    pub fn is_held(&self, host: &str) -> bool {
        self.locks
            .get(host)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of addresses with a holder or waiter
    pub fn tracked_hosts(&self) -> usize {
        self.locks.len()
    }
}
