//! Per-URL locks for first fetches of cacheable responses.
//!
//! The first request for an uncached URL holds the lock until its response
//! is stored; later requests for the same URL wait and then read the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of in-flight fetches keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    locks: Arc<Mutex<LockMap>>,
}

/// Held while a fetch for `key` is outstanding.
#[derive(Debug)]
pub struct InFlightGuard {
    key: String,
    owner: InFlight,
    _lock: OwnedMutexGuard<()>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for any outstanding fetch of `key`, then take the lock.
    pub async fn acquire(&self, key: &str) -> InFlightGuard {
        let lock = {
            let mut locks = self.map();
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        InFlightGuard { key: key.to_string(), owner: self.clone(), _lock: guard }
    }

    /// Number of URLs with an outstanding or waiting fetch.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn map(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut locks = self.owner.map();
        // The map and this guard are the only holders: nobody is waiting.
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) <= 2) {
            locks.remove(&self.key);
        }
    }
}
